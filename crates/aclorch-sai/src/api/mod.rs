//! Programming-client interfaces toward the forwarding plane.
//!
//! Each submodule covers one SAI object family. The orchestration layer only
//! talks to the forwarding plane through these traits, which keeps every
//! manager above this line pure and testable.

pub mod acl;

pub use acl::{AclAsicApi, InMemoryAclApi};
