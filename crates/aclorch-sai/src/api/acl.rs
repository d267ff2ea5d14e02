//! ACL programming client.
//!
//! The [`AclAsicApi`] trait is the only path from the ACL orchestration
//! engine to the forwarding plane. Objects are created with ordered
//! attribute lists in the serialized wire form the ASIC state database uses;
//! creation returns the object id, removal takes it back.
//!
//! [`InMemoryAclApi`] is a software implementation that records every
//! programmed object. The daemon runs against it in simulation mode and the
//! test suites assert on its object store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{SaiError, SaiResult};
use crate::types::RawSaiObjectId;

/// A serialized SAI attribute: `(attribute id, value)`.
pub type SaiAttr = (String, String);

/// Attribute and value identifiers used by the ACL object family.
pub mod attr {
    // ACL table
    pub const TABLE_STAGE: &str = "SAI_ACL_TABLE_ATTR_ACL_STAGE";
    pub const TABLE_BIND_POINT_TYPE_LIST: &str = "SAI_ACL_TABLE_ATTR_ACL_BIND_POINT_TYPE_LIST";

    // ACL table group
    pub const GROUP_STAGE: &str = "SAI_ACL_TABLE_GROUP_ATTR_ACL_STAGE";
    pub const GROUP_BIND_POINT_TYPE_LIST: &str =
        "SAI_ACL_TABLE_GROUP_ATTR_ACL_BIND_POINT_TYPE_LIST";
    pub const GROUP_TYPE: &str = "SAI_ACL_TABLE_GROUP_ATTR_TYPE";
    pub const GROUP_TYPE_PARALLEL: &str = "SAI_ACL_TABLE_GROUP_TYPE_PARALLEL";

    // ACL table group member
    pub const MEMBER_GROUP_ID: &str = "SAI_ACL_TABLE_GROUP_MEMBER_ATTR_ACL_TABLE_GROUP_ID";
    pub const MEMBER_TABLE_ID: &str = "SAI_ACL_TABLE_GROUP_MEMBER_ATTR_ACL_TABLE_ID";
    pub const MEMBER_PRIORITY: &str = "SAI_ACL_TABLE_GROUP_MEMBER_ATTR_PRIORITY";

    // ACL entry
    pub const ENTRY_TABLE_ID: &str = "SAI_ACL_ENTRY_ATTR_TABLE_ID";
    pub const ENTRY_PRIORITY: &str = "SAI_ACL_ENTRY_ATTR_PRIORITY";
    pub const ENTRY_ADMIN_STATE: &str = "SAI_ACL_ENTRY_ATTR_ADMIN_STATE";
    pub const ENTRY_FIELD_ACL_RANGE_TYPE: &str = "SAI_ACL_ENTRY_ATTR_FIELD_ACL_RANGE_TYPE";
    pub const ENTRY_ACTION_PACKET_ACTION: &str = "SAI_ACL_ENTRY_ATTR_ACTION_PACKET_ACTION";
    pub const ENTRY_ACTION_REDIRECT: &str = "SAI_ACL_ENTRY_ATTR_ACTION_REDIRECT";

    pub const PACKET_ACTION_FORWARD: &str = "SAI_PACKET_ACTION_FORWARD";
    pub const PACKET_ACTION_DROP: &str = "SAI_PACKET_ACTION_DROP";

    // ACL range
    pub const RANGE_TYPE: &str = "SAI_ACL_RANGE_ATTR_TYPE";
    pub const RANGE_LIMIT: &str = "SAI_ACL_RANGE_ATTR_LIMIT";

    // Bind-point ACL group attachment
    pub const PORT_INGRESS_ACL: &str = "SAI_PORT_ATTR_INGRESS_ACL";
    pub const PORT_EGRESS_ACL: &str = "SAI_PORT_ATTR_EGRESS_ACL";
    pub const LAG_INGRESS_ACL: &str = "SAI_LAG_ATTR_INGRESS_ACL";
    pub const LAG_EGRESS_ACL: &str = "SAI_LAG_ATTR_EGRESS_ACL";
}

/// Formats a raw object id in the serialized wire form.
pub fn format_oid(oid: RawSaiObjectId) -> String {
    format!("oid:0x{:x}", oid)
}

/// Formats a counted object id list (`"N:oid:0x…,oid:0x…"`).
pub fn format_oid_list(oids: &[RawSaiObjectId]) -> String {
    let items: Vec<String> = oids.iter().map(|o| format_oid(*o)).collect();
    format!("{}:{}", oids.len(), items.join(","))
}

/// ACL programming client toward the forwarding plane.
///
/// Every create is atomic: it either installs the whole object with all its
/// attributes or fails without side effects. The orchestration layer relies
/// on this to guarantee that no partially-programmed rule is ever observable.
pub trait AclAsicApi: Send + Sync {
    fn create_acl_table(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId>;
    fn remove_acl_table(&self, oid: RawSaiObjectId) -> SaiResult<()>;

    fn create_acl_table_group(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId>;
    fn remove_acl_table_group(&self, oid: RawSaiObjectId) -> SaiResult<()>;

    fn create_acl_table_group_member(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId>;
    fn remove_acl_table_group_member(&self, oid: RawSaiObjectId) -> SaiResult<()>;

    fn create_acl_entry(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId>;
    fn remove_acl_entry(&self, oid: RawSaiObjectId) -> SaiResult<()>;

    fn create_acl_range(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId>;
    fn remove_acl_range(&self, oid: RawSaiObjectId) -> SaiResult<()>;

    /// Attaches an ACL group to a bind point (`attr` selects port/LAG and
    /// ingress/egress, see [`attr`]).
    fn bind_acl_group(
        &self,
        bind_point: RawSaiObjectId,
        attr: &'static str,
        group: RawSaiObjectId,
    ) -> SaiResult<()>;

    /// Detaches the ACL group from a bind point.
    fn unbind_acl_group(&self, bind_point: RawSaiObjectId, attr: &'static str) -> SaiResult<()>;
}

/// Kinds of objects the ACL programming client creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaiObjectType {
    AclTable,
    AclTableGroup,
    AclTableGroupMember,
    AclEntry,
    AclRange,
}

/// A recorded forwarding-plane object.
#[derive(Debug, Clone)]
pub struct SaiObject {
    pub oid: RawSaiObjectId,
    pub object_type: SaiObjectType,
    pub attributes: Vec<SaiAttr>,
}

impl SaiObject {
    /// Returns the value of an attribute, if present.
    pub fn attr(&self, id: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(a, _)| a == id)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct Store {
    objects: BTreeMap<RawSaiObjectId, SaiObject>,
    // (bind point oid, binding attribute) -> group oid
    bindings: BTreeMap<(RawSaiObjectId, &'static str), RawSaiObjectId>,
    next_oid: RawSaiObjectId,
}

/// In-memory ACL programming client.
///
/// Behaves like a virtual forwarding plane: assigns monotonically increasing
/// object ids, stores attributes verbatim, and rejects removal of unknown
/// objects or groups that still have members.
#[derive(Default)]
pub struct InMemoryAclApi {
    store: Mutex<Store>,
}

impl InMemoryAclApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, object_type: SaiObjectType, attributes: Vec<SaiAttr>) -> RawSaiObjectId {
        let mut store = self.store.lock().unwrap();
        store.next_oid += 1;
        let oid = store.next_oid;
        log::debug!("asic create {:?} oid 0x{:x}", object_type, oid);
        store.objects.insert(
            oid,
            SaiObject {
                oid,
                object_type,
                attributes,
            },
        );
        oid
    }

    fn remove(&self, object_type: SaiObjectType, oid: RawSaiObjectId) -> SaiResult<()> {
        let mut store = self.store.lock().unwrap();
        match store.objects.get(&oid) {
            Some(obj) if obj.object_type == object_type => {
                log::debug!("asic remove {:?} oid 0x{:x}", object_type, oid);
                store.objects.remove(&oid);
                Ok(())
            }
            Some(obj) => Err(SaiError::invalid_parameter(format!(
                "oid 0x{:x} is {:?}, not {:?}",
                oid, obj.object_type, object_type
            ))),
            None => Err(SaiError::not_found(format!("oid 0x{:x}", oid))),
        }
    }

    /// Returns the number of recorded objects of a type.
    pub fn count(&self, object_type: SaiObjectType) -> usize {
        self.store
            .lock()
            .unwrap()
            .objects
            .values()
            .filter(|o| o.object_type == object_type)
            .count()
    }

    /// Returns all recorded objects of a type, in creation order.
    pub fn objects_of(&self, object_type: SaiObjectType) -> Vec<SaiObject> {
        self.store
            .lock()
            .unwrap()
            .objects
            .values()
            .filter(|o| o.object_type == object_type)
            .cloned()
            .collect()
    }

    /// Returns a recorded object by id.
    pub fn get(&self, oid: RawSaiObjectId) -> Option<SaiObject> {
        self.store.lock().unwrap().objects.get(&oid).cloned()
    }

    /// Returns the group attached to a bind point via the given attribute.
    pub fn bound_group(
        &self,
        bind_point: RawSaiObjectId,
        attr: &'static str,
    ) -> Option<RawSaiObjectId> {
        self.store
            .lock()
            .unwrap()
            .bindings
            .get(&(bind_point, attr))
            .copied()
    }

    /// Returns the total number of recorded objects.
    pub fn total_objects(&self) -> usize {
        self.store.lock().unwrap().objects.len()
    }
}

impl AclAsicApi for InMemoryAclApi {
    fn create_acl_table(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId> {
        Ok(self.create(SaiObjectType::AclTable, attrs))
    }

    fn remove_acl_table(&self, oid: RawSaiObjectId) -> SaiResult<()> {
        // A table with live entries cannot be removed.
        let has_entries = {
            let store = self.store.lock().unwrap();
            let table_ref = format_oid(oid);
            store.objects.values().any(|o| {
                o.object_type == SaiObjectType::AclEntry
                    && o.attr(attr::ENTRY_TABLE_ID) == Some(table_ref.as_str())
            })
        };
        if has_entries {
            return Err(SaiError::object_in_use(format!("acl table 0x{:x}", oid)));
        }
        self.remove(SaiObjectType::AclTable, oid)
    }

    fn create_acl_table_group(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId> {
        Ok(self.create(SaiObjectType::AclTableGroup, attrs))
    }

    fn remove_acl_table_group(&self, oid: RawSaiObjectId) -> SaiResult<()> {
        let has_members = {
            let store = self.store.lock().unwrap();
            let group_ref = format_oid(oid);
            store.objects.values().any(|o| {
                o.object_type == SaiObjectType::AclTableGroupMember
                    && o.attr(attr::MEMBER_GROUP_ID) == Some(group_ref.as_str())
            })
        };
        if has_members {
            return Err(SaiError::object_in_use(format!("acl group 0x{:x}", oid)));
        }
        self.remove(SaiObjectType::AclTableGroup, oid)
    }

    fn create_acl_table_group_member(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId> {
        Ok(self.create(SaiObjectType::AclTableGroupMember, attrs))
    }

    fn remove_acl_table_group_member(&self, oid: RawSaiObjectId) -> SaiResult<()> {
        self.remove(SaiObjectType::AclTableGroupMember, oid)
    }

    fn create_acl_entry(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId> {
        Ok(self.create(SaiObjectType::AclEntry, attrs))
    }

    fn remove_acl_entry(&self, oid: RawSaiObjectId) -> SaiResult<()> {
        self.remove(SaiObjectType::AclEntry, oid)
    }

    fn create_acl_range(&self, attrs: Vec<SaiAttr>) -> SaiResult<RawSaiObjectId> {
        Ok(self.create(SaiObjectType::AclRange, attrs))
    }

    fn remove_acl_range(&self, oid: RawSaiObjectId) -> SaiResult<()> {
        self.remove(SaiObjectType::AclRange, oid)
    }

    fn bind_acl_group(
        &self,
        bind_point: RawSaiObjectId,
        attr: &'static str,
        group: RawSaiObjectId,
    ) -> SaiResult<()> {
        let mut store = self.store.lock().unwrap();
        store.bindings.insert((bind_point, attr), group);
        Ok(())
    }

    fn unbind_acl_group(&self, bind_point: RawSaiObjectId, attr: &'static str) -> SaiResult<()> {
        let mut store = self.store.lock().unwrap();
        store
            .bindings
            .remove(&(bind_point, attr))
            .map(|_| ())
            .ok_or_else(|| SaiError::not_found(format!("binding on 0x{:x}", bind_point)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_formatting() {
        assert_eq!(format_oid(0x2a), "oid:0x2a");
        assert_eq!(format_oid_list(&[1, 2]), "2:oid:0x1,oid:0x2");
    }

    #[test]
    fn test_create_and_remove() {
        let api = InMemoryAclApi::new();
        let oid = api
            .create_acl_table(vec![(attr::TABLE_STAGE.to_string(), "INGRESS".to_string())])
            .unwrap();
        assert_eq!(api.count(SaiObjectType::AclTable), 1);
        assert_eq!(
            api.get(oid).unwrap().attr(attr::TABLE_STAGE),
            Some("INGRESS")
        );

        api.remove_acl_table(oid).unwrap();
        assert_eq!(api.count(SaiObjectType::AclTable), 0);
    }

    #[test]
    fn test_remove_unknown_fails() {
        let api = InMemoryAclApi::new();
        assert!(api.remove_acl_entry(42).is_err());
    }

    #[test]
    fn test_remove_wrong_type_fails() {
        let api = InMemoryAclApi::new();
        let oid = api.create_acl_table(vec![]).unwrap();
        assert!(api.remove_acl_entry(oid).is_err());
    }

    #[test]
    fn test_group_in_use_protection() {
        let api = InMemoryAclApi::new();
        let group = api.create_acl_table_group(vec![]).unwrap();
        let member = api
            .create_acl_table_group_member(vec![(
                attr::MEMBER_GROUP_ID.to_string(),
                format_oid(group),
            )])
            .unwrap();

        assert!(api.remove_acl_table_group(group).is_err());
        api.remove_acl_table_group_member(member).unwrap();
        api.remove_acl_table_group(group).unwrap();
    }

    #[test]
    fn test_table_in_use_protection() {
        let api = InMemoryAclApi::new();
        let table = api.create_acl_table(vec![]).unwrap();
        let entry = api
            .create_acl_entry(vec![(attr::ENTRY_TABLE_ID.to_string(), format_oid(table))])
            .unwrap();

        assert!(api.remove_acl_table(table).is_err());
        api.remove_acl_entry(entry).unwrap();
        api.remove_acl_table(table).unwrap();
    }

    #[test]
    fn test_bindings() {
        let api = InMemoryAclApi::new();
        let group = api.create_acl_table_group(vec![]).unwrap();
        api.bind_acl_group(0x100, attr::PORT_INGRESS_ACL, group)
            .unwrap();
        assert_eq!(api.bound_group(0x100, attr::PORT_INGRESS_ACL), Some(group));

        api.unbind_acl_group(0x100, attr::PORT_INGRESS_ACL).unwrap();
        assert_eq!(api.bound_group(0x100, attr::PORT_INGRESS_ACL), None);
        assert!(api.unbind_acl_group(0x100, attr::PORT_INGRESS_ACL).is_err());
    }
}
