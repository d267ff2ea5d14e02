//! Next-hop registry for redirect resolution.
//!
//! Next-hop objects are installed by neighbor resolution outside the ACL
//! core (typically when an adjacency is learned) and looked up here when a
//! redirect rule is instantiated. A redirect whose next-hop does not exist
//! yet fails fast; re-submission after the neighbor appears is the
//! configuration source's job.

mod registry;
mod types;

pub use registry::NextHopRegistry;
pub use types::{NextHopEntry, NextHopKey};
