//! Forwarding-plane programming boundary for the ACL orchestration engine.
//!
//! Everything above this crate is pure bookkeeping; this is the only path to
//! the forwarding plane. The crate provides:
//!
//! - [`types`]: type-safe SAI object ids so a port oid can never be passed
//!   where an ACL table oid is expected
//! - [`error`]: SAI status codes and error conversion
//! - [`api::acl`]: the [`api::acl::AclAsicApi`] programming-client trait and
//!   an in-memory implementation that records programmed objects for
//!   simulation mode and tests
//!
//! Attribute values travel as ordered `(id, value)` string pairs in the same
//! serialized form the ASIC state database uses (`"value&mask:mask"`,
//! `"oid:0x…"`, counted lists). Keeping the wire form at this boundary means
//! tests can assert on exactly what would reach hardware.

pub mod api;
pub mod error;
pub mod types;

pub use api::acl::{AclAsicApi, InMemoryAclApi, SaiAttr, SaiObject, SaiObjectType};
pub use error::{SaiError, SaiResult, SaiStatus};
pub use types::{
    AclCounterOid, AclEntryOid, AclRangeOid, AclTableGroupMemberOid, AclTableGroupOid,
    AclTableOid, LagOid, NextHopOid, PortOid, RawSaiObjectId, RouterInterfaceOid, SaiObjectId,
    SaiObjectKind, SwitchOid,
};
