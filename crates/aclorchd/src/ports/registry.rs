//! Interface name resolution.

use std::collections::HashMap;
use std::sync::RwLock;

use aclorch_sai::{LagOid, PortOid};

use super::types::{BindPointId, PortEntry};

/// Result of resolving a comma-separated interface name list.
///
/// The resolver only reports; whether a rule proceeds with a partial set is
/// the rule manager's policy, not the resolver's.
#[derive(Debug, Clone, Default)]
pub struct PortListResolution {
    /// Entries that resolved, in input order.
    pub resolved: Vec<PortEntry>,
    /// Names that did not resolve, in input order.
    pub unresolved: Vec<String>,
}

impl PortListResolution {
    /// Returns true if nothing resolved.
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Returns true if some names were dropped but others resolved.
    pub fn is_partial(&self) -> bool {
        !self.resolved.is_empty() && !self.unresolved.is_empty()
    }

    /// Raw object ids of the resolved entries.
    pub fn raw_ids(&self) -> Vec<u64> {
        self.resolved.iter().map(|e| e.id.as_raw()).collect()
    }
}

/// Registry of logical interface names.
///
/// Shared read-mostly state: port discovery writes, the ACL core reads.
#[derive(Debug, Default)]
pub struct PortRegistry {
    entries: RwLock<HashMap<String, PortEntry>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a physical port.
    pub fn add_port(&self, alias: impl Into<String>, oid: PortOid) {
        let alias = alias.into();
        self.entries.write().unwrap_or_else(|e| e.into_inner()).insert(
            alias.clone(),
            PortEntry {
                alias,
                id: BindPointId::Port(oid),
            },
        );
    }

    /// Registers a LAG.
    pub fn add_lag(&self, alias: impl Into<String>, oid: LagOid) {
        let alias = alias.into();
        self.entries.write().unwrap_or_else(|e| e.into_inner()).insert(
            alias.clone(),
            PortEntry {
                alias,
                id: BindPointId::Lag(oid),
            },
        );
    }

    /// Removes an interface.
    pub fn remove(&self, alias: &str) -> Option<PortEntry> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(alias)
    }

    /// Looks up one interface by name.
    pub fn get(&self, alias: &str) -> Option<PortEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(alias)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a comma-separated interface name list, dropping (and
    /// reporting) names with no registered object.
    pub fn resolve_list(&self, list: &str) -> PortListResolution {
        let mut result = PortListResolution::default();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match self.get(name) {
                Some(entry) => result.resolved.push(entry),
                None => result.unresolved.push(name.to_string()),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> PortRegistry {
        let reg = PortRegistry::new();
        reg.add_port("Ethernet0", PortOid::from_raw_unchecked(0x100));
        reg.add_port("Ethernet4", PortOid::from_raw_unchecked(0x101));
        reg.add_lag("PortChannel0001", LagOid::from_raw_unchecked(0x200));
        reg
    }

    #[test]
    fn test_lookup() {
        let reg = registry();
        assert_eq!(reg.len(), 3);
        assert!(reg.get("Ethernet0").is_some());
        assert!(reg.get("PortChannel0001").unwrap().is_lag());
        assert!(reg.get("Ethernet8").is_none());
    }

    #[test]
    fn test_resolve_full_list() {
        let reg = registry();
        let res = reg.resolve_list("Ethernet0,Ethernet4");
        assert_eq!(res.resolved.len(), 2);
        assert!(res.unresolved.is_empty());
        assert!(!res.is_partial());
        assert_eq!(res.raw_ids(), vec![0x100, 0x101]);
    }

    #[test]
    fn test_resolve_partial_list() {
        let reg = registry();
        let res = reg.resolve_list("Ethernet0,FOO_BAR_BAZ");
        assert_eq!(res.resolved.len(), 1);
        assert_eq!(res.unresolved, vec!["FOO_BAR_BAZ".to_string()]);
        assert!(res.is_partial());
    }

    #[test]
    fn test_resolve_nothing() {
        let reg = registry();
        let res = reg.resolve_list("FOO_BAR_BAZ");
        assert!(res.is_empty());
        assert!(!res.is_partial());
    }

    #[test]
    fn test_resolve_tolerates_whitespace_and_empties() {
        let reg = registry();
        let res = reg.resolve_list(" Ethernet0 ,, Ethernet4 ");
        assert_eq!(res.resolved.len(), 2);
        assert!(res.unresolved.is_empty());
    }

    #[test]
    fn test_remove() {
        let reg = registry();
        assert!(reg.remove("Ethernet0").is_some());
        assert!(reg.get("Ethernet0").is_none());
        assert!(reg.remove("Ethernet0").is_none());
    }
}
