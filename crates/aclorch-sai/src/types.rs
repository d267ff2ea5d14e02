//! Type-safe SAI object id wrappers.
//!
//! Raw SAI object ids are all `u64`, which makes it easy to hand a next-hop
//! id to an API expecting an ACL table. The phantom-typed wrapper keeps the
//! distinction at compile time with zero runtime cost.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw SAI object id type (matches `sai_object_id_t`).
pub type RawSaiObjectId = u64;

/// Marker trait for SAI object kinds.
pub trait SaiObjectKind: Send + Sync + 'static {
    /// Returns the SAI object type name for debugging.
    fn type_name() -> &'static str;
}

/// A type-safe SAI object id.
///
/// The phantom type parameter `T` indicates what kind of SAI object this id
/// refers to; ids of different kinds do not compare or assign to each other.
#[derive(Clone, Copy)]
pub struct SaiObjectId<T: SaiObjectKind> {
    raw: RawSaiObjectId,
    _marker: PhantomData<T>,
}

impl<T: SaiObjectKind> SaiObjectId<T> {
    /// The null object id (`SAI_NULL_OBJECT_ID`).
    pub const NULL: Self = Self {
        raw: 0,
        _marker: PhantomData,
    };

    /// Creates an object id from a raw value; `None` for the null id.
    pub fn from_raw(raw: RawSaiObjectId) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self {
                raw,
                _marker: PhantomData,
            })
        }
    }

    /// Creates an object id from a raw value, null included.
    pub const fn from_raw_unchecked(raw: RawSaiObjectId) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Returns the raw object id value.
    pub const fn as_raw(&self) -> RawSaiObjectId {
        self.raw
    }

    /// Returns true if this is the null object id.
    pub const fn is_null(&self) -> bool {
        self.raw == 0
    }

    /// Returns true if this is a valid (non-null) object id.
    pub const fn is_valid(&self) -> bool {
        self.raw != 0
    }
}

impl<T: SaiObjectKind> fmt::Debug for SaiObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:x})", T::type_name(), self.raw)
    }
}

impl<T: SaiObjectKind> fmt::Display for SaiObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oid:0x{:x}", self.raw)
    }
}

impl<T: SaiObjectKind> PartialEq for SaiObjectId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: SaiObjectKind> Eq for SaiObjectId<T> {}

impl<T: SaiObjectKind> Hash for SaiObjectId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: SaiObjectKind> Default for SaiObjectId<T> {
    fn default() -> Self {
        Self::NULL
    }
}

macro_rules! define_object_kind {
    ($name:ident, $type_name:literal, $oid_alias:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl SaiObjectKind for $name {
            fn type_name() -> &'static str {
                $type_name
            }
        }

        pub type $oid_alias = SaiObjectId<$name>;
    };
}

// The object kinds the ACL engine touches.
define_object_kind!(SwitchKind, "Switch", SwitchOid);
define_object_kind!(PortKind, "Port", PortOid);
define_object_kind!(LagKind, "Lag", LagOid);
define_object_kind!(RouterInterfaceKind, "RouterInterface", RouterInterfaceOid);
define_object_kind!(NextHopKind, "NextHop", NextHopOid);
define_object_kind!(AclTableKind, "AclTable", AclTableOid);
define_object_kind!(AclTableGroupKind, "AclTableGroup", AclTableGroupOid);
define_object_kind!(
    AclTableGroupMemberKind,
    "AclTableGroupMember",
    AclTableGroupMemberOid
);
define_object_kind!(AclEntryKind, "AclEntry", AclEntryOid);
define_object_kind!(AclRangeKind, "AclRange", AclRangeOid);
define_object_kind!(AclCounterKind, "AclCounter", AclCounterOid);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_creation() {
        let table = AclTableOid::from_raw(0x7000000000001).unwrap();
        assert_eq!(table.as_raw(), 0x7000000000001);
        assert!(table.is_valid());
    }

    #[test]
    fn test_null_oid() {
        assert!(AclTableOid::from_raw(0).is_none());
        assert!(AclTableOid::NULL.is_null());
        assert!(!AclTableOid::NULL.is_valid());
    }

    #[test]
    fn test_oid_display_wire_form() {
        let nh = NextHopOid::from_raw(0x40000000002a).unwrap();
        assert_eq!(nh.to_string(), "oid:0x40000000002a");
    }

    #[test]
    fn test_oid_debug_names_kind() {
        let port = PortOid::from_raw(0x1).unwrap();
        assert!(format!("{:?}", port).contains("Port"));
    }
}
