//! Shared L4 port-range objects.
//!
//! Range matches program through a dedicated forwarding-plane range object
//! rather than a direct field. Two rules specifying the same numeric range
//! share one object; a reference-counted cache keyed by range value keeps
//! the sharing honest and releases the object with its last referencing
//! rule.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use aclorch_sai::{RawSaiObjectId, SaiResult};

/// Kind of range a rule can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclRangeType {
    /// L4 source port range.
    L4SrcPort,
    /// L4 destination port range.
    L4DstPort,
}

impl AclRangeType {
    /// Returns the SAI range type identifier.
    pub fn sai_value(&self) -> &'static str {
        match self {
            Self::L4SrcPort => "SAI_ACL_RANGE_TYPE_L4_SRC_PORT_RANGE",
            Self::L4DstPort => "SAI_ACL_RANGE_TYPE_L4_DST_PORT_RANGE",
        }
    }
}

impl fmt::Display for AclRangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L4SrcPort => write!(f, "L4_SRC_PORT"),
            Self::L4DstPort => write!(f, "L4_DST_PORT"),
        }
    }
}

/// Value identity of a range: two rules with equal properties share one
/// forwarding-plane object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclRangeProperties {
    pub range_type: AclRangeType,
    /// Minimum port (inclusive).
    pub min: u16,
    /// Maximum port (inclusive).
    pub max: u16,
}

impl AclRangeProperties {
    pub fn new(range_type: AclRangeType, min: u16, max: u16) -> Self {
        Self {
            range_type,
            min,
            max,
        }
    }

    /// The serialized limit value programmed on the range object.
    pub fn limit_value(&self) -> String {
        format!("{},{}", self.min, self.max)
    }
}

impl fmt::Display for AclRangeProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.range_type, self.min, self.max)
    }
}

#[derive(Debug)]
struct CachedRange {
    oid: RawSaiObjectId,
    ref_count: u32,
}

/// Reference-counted cache of forwarding-plane range objects.
#[derive(Debug, Default)]
pub struct AclRangeCache {
    ranges: Mutex<HashMap<AclRangeProperties, CachedRange>>,
}

impl AclRangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object id for a range, creating the object through
    /// `create_fn` if no rule references these properties yet.
    pub fn get_or_create<F>(
        &self,
        properties: AclRangeProperties,
        create_fn: F,
    ) -> SaiResult<RawSaiObjectId>
    where
        F: FnOnce(&AclRangeProperties) -> SaiResult<RawSaiObjectId>,
    {
        let mut ranges = self.ranges.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(range) = ranges.get_mut(&properties) {
            range.ref_count += 1;
            return Ok(range.oid);
        }

        let oid = create_fn(&properties)?;
        ranges.insert(properties, CachedRange { oid, ref_count: 1 });
        Ok(oid)
    }

    /// Drops one reference to a range; the last reference removes the
    /// forwarding-plane object through `remove_fn`.
    pub fn release<F>(&self, properties: &AclRangeProperties, remove_fn: F) -> SaiResult<()>
    where
        F: FnOnce(RawSaiObjectId) -> SaiResult<()>,
    {
        let mut ranges = self.ranges.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(range) = ranges.get_mut(properties) {
            range.ref_count = range.ref_count.saturating_sub(1);
            if range.ref_count == 0 {
                let oid = range.oid;
                ranges.remove(properties);
                return remove_fn(oid);
            }
        }
        Ok(())
    }

    /// Returns the object id for a range without touching its reference
    /// count, if cached.
    pub fn get(&self, properties: &AclRangeProperties) -> Option<RawSaiObjectId> {
        self.ranges
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(properties)
            .map(|r| r.oid)
    }

    /// Returns the current reference count for a range, if cached.
    pub fn ref_count(&self, properties: &AclRangeProperties) -> Option<u32> {
        self.ranges
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(properties)
            .map(|r| r.ref_count)
    }

    pub fn len(&self) -> usize {
        self.ranges
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn props() -> AclRangeProperties {
        AclRangeProperties::new(AclRangeType::L4SrcPort, 1000, 2000)
    }

    #[test]
    fn test_properties_display() {
        assert_eq!(props().to_string(), "L4_SRC_PORT:1000-2000");
        assert_eq!(props().limit_value(), "1000,2000");
        assert_eq!(
            AclRangeType::L4DstPort.sai_value(),
            "SAI_ACL_RANGE_TYPE_L4_DST_PORT_RANGE"
        );
    }

    #[test]
    fn test_sharing_by_value() {
        let cache = AclRangeCache::new();

        let oid1 = cache.get_or_create(props(), |_| Ok(0x1234)).unwrap();
        assert_eq!(oid1, 0x1234);
        assert_eq!(cache.len(), 1);

        // Second rule with the same range reuses the object.
        let oid2 = cache.get_or_create(props(), |_| Ok(0x5678)).unwrap();
        assert_eq!(oid2, 0x1234);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.ref_count(&props()), Some(2));
    }

    #[test]
    fn test_release_removes_on_last_reference() {
        let cache = AclRangeCache::new();
        cache.get_or_create(props(), |_| Ok(0x1234)).unwrap();
        cache.get_or_create(props(), |_| Ok(0x1234)).unwrap();

        let mut removed = false;
        cache
            .release(&props(), |_| {
                removed = true;
                Ok(())
            })
            .unwrap();
        assert!(!removed);
        assert_eq!(cache.len(), 1);

        cache
            .release(&props(), |oid| {
                assert_eq!(oid, 0x1234);
                removed = true;
                Ok(())
            })
            .unwrap();
        assert!(removed);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_distinct_properties_distinct_objects() {
        let cache = AclRangeCache::new();
        cache.get_or_create(props(), |_| Ok(1)).unwrap();
        cache
            .get_or_create(
                AclRangeProperties::new(AclRangeType::L4DstPort, 1000, 2000),
                |_| Ok(2),
            )
            .unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_create_failure_leaves_no_entry() {
        let cache = AclRangeCache::new();
        let result = cache.get_or_create(props(), |_| {
            Err(aclorch_sai::SaiError::invalid_parameter("boom"))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let cache = AclRangeCache::new();
        cache.release(&props(), |_| Ok(())).unwrap();
        assert!(cache.is_empty());
    }
}
