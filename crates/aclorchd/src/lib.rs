//! ACL orchestration daemon.
//!
//! Translates declarative access-control configuration (tables and rules)
//! into forwarding-plane programming objects, while tracking scarce binding
//! resources and enforcing device capability constraints.
//!
//! # Architecture
//!
//! ```text
//! ACL_TABLE / ACL_RULE events
//!        │
//!        ▼
//!    AclOrch ──┬──> QualifierCompiler (qualifier → match field/mask)
//!              ├──> AclCapabilities   (per-stage action gating)
//!              ├──> PortRegistry      (name → port/LAG object)
//!              ├──> NextHopRegistry   (redirect targets)
//!              ├──> RuleSequence      (priority ordering)
//!              └──> AclAsicApi        (the only path to the forwarding plane)
//! ```
//!
//! Configuration events for a namespace are processed strictly in arrival
//! order by one control loop; compilation and validation are pure, and only
//! the final apply/withdraw crosses the [`aclorch_sai::AclAsicApi`] boundary.
//! A rejected rule never reaches the forwarding plane and never leaves a
//! partial object behind.
//!
//! # Key components
//!
//! - [`acl::AclOrch`]: table and rule lifecycle, resource accounting
//! - [`acl::QualifierCompiler`]: pure qualifier-to-field translation
//! - [`acl::AclTableType`]: per-type legal qualifier/action sets
//! - [`ports::PortRegistry`] / [`neigh::NextHopRegistry`]: cross-object
//!   registries owned outside the rule lifecycle
//! - [`crm::AclResourceCounters`]: per-(stage, bind-point-kind) usage

pub mod acl;
pub mod config;
pub mod crm;
pub mod neigh;
pub mod ports;

pub use acl::{
    AclBindPointType, AclCapabilities, AclMatchField, AclOrch, AclOrchConfig, AclOrchError,
    AclPacketAction, AclPriority, AclRule, AclRuleAction, AclRuleConfig, AclRuleId, AclRuleState,
    AclStage, AclStageCapabilities, AclTable, AclTableConfig, AclTableId, AclTableType,
    AclTableTypeBuilder, CompiledQualifier, QualifierCompiler, RuleRejection,
};
pub use crm::AclResourceCounters;
pub use neigh::{NextHopKey, NextHopRegistry};
pub use ports::{BindPointId, PortEntry, PortRegistry};
