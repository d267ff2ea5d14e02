//! Next-hop object registry.

use std::collections::HashMap;
use std::sync::RwLock;

use aclorch_sai::NextHopOid;
use aclorch_types::MacAddress;

use super::types::{NextHopEntry, NextHopKey};

/// Registry of installed next-hop objects.
///
/// Mutated by the neighbor-resolution collaborator, read by the ACL core.
/// Rules store the raw next-hop object id; the registry outlives them.
#[derive(Debug, Default)]
pub struct NextHopRegistry {
    entries: RwLock<HashMap<NextHopKey, NextHopEntry>>,
}

impl NextHopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a next-hop object for an adjacency.
    pub fn install(&self, key: NextHopKey, mac: MacAddress, oid: NextHopOid) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), NextHopEntry { key, mac, oid });
    }

    /// Removes a next-hop object, returning it if it was installed.
    pub fn remove(&self, key: &NextHopKey) -> Option<NextHopEntry> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
    }

    /// Looks up the next-hop object id for an adjacency.
    pub fn get(&self, key: &NextHopKey) -> Option<NextHopOid> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|e| e.oid)
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
}
