//! Bind point identity types.

use crate::acl::AclBindPointType;
use aclorch_sai::{LagOid, PortOid, RawSaiObjectId};

/// Forwarding-plane identity of an ACL bind point.
///
/// Ports and LAGs are distinct SAI object kinds; the enum keeps that
/// distinction while still allowing uniform raw-id access where the ACL
/// structures need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindPointId {
    Port(PortOid),
    Lag(LagOid),
}

impl BindPointId {
    /// Returns the bind point kind.
    pub fn kind(&self) -> AclBindPointType {
        match self {
            Self::Port(_) => AclBindPointType::Port,
            Self::Lag(_) => AclBindPointType::Lag,
        }
    }

    /// Returns the raw SAI object id.
    pub fn as_raw(&self) -> RawSaiObjectId {
        match self {
            Self::Port(oid) => oid.as_raw(),
            Self::Lag(oid) => oid.as_raw(),
        }
    }
}

/// A registered interface.
#[derive(Debug, Clone)]
pub struct PortEntry {
    /// Logical name (e.g. "Ethernet0", "PortChannel0001").
    pub alias: String,
    /// Forwarding-plane identity.
    pub id: BindPointId,
}

impl PortEntry {
    pub fn is_lag(&self) -> bool {
        matches!(self.id, BindPointId::Lag(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_point_kind_and_raw() {
        let port = BindPointId::Port(PortOid::from_raw_unchecked(0x10));
        assert_eq!(port.kind(), AclBindPointType::Port);
        assert_eq!(port.as_raw(), 0x10);

        let lag = BindPointId::Lag(LagOid::from_raw_unchecked(0x20));
        assert_eq!(lag.kind(), AclBindPointType::Lag);
        assert_eq!(lag.as_raw(), 0x20);
    }
}
