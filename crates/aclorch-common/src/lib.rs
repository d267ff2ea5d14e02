//! Common orchestration abstractions for the ACL engine.
//!
//! - [`Orch`]: base trait for orchestration agents driven by an event loop
//! - [`Consumer`]: keyed SET/DEL event queue with merge and deduplication
//! - [`SyncMap`]: map that never creates entries implicitly
//! - [`TaskStatus`] / [`TaskError`]: per-event processing results
//!
//! The event model is a single logical writer: configuration changes for a
//! namespace arrive as [`KeyOpFieldsValues`] entries, a [`Consumer`] queues
//! and deduplicates them, and the owning [`Orch`] drains them strictly in
//! arrival order from its `do_task` loop.

mod consumer;
mod orch;
mod sync_map;
mod task;

pub use consumer::{Consumer, ConsumerConfig, FieldValue, KeyOpFieldsValues, Operation};
pub use orch::Orch;
pub use sync_map::{HasRefCount, SyncMap, SyncMapError};
pub use task::{TaskError, TaskResult, TaskStatus};
