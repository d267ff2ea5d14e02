//! Critical-resource accounting for ACL table bindings.
//!
//! Hardware bounds how many ACL tables can bind at each stage and bind-point
//! kind. The counters here are mutated only by the table manager, strictly
//! paired with the bind/unbind they account for, and exposed read-only to
//! telemetry collaborators.

mod counters;

pub use counters::{AclResourceCounters, ResourceCounter};
