//! ACL orchestration.
//!
//! Converts declarative ACL tables and rules into forwarding-plane
//! programming:
//!
//! - [`AclTableType`] fixes the legal qualifier/action sets per table type
//! - [`QualifierCompiler`] translates qualifiers into match fields (pure)
//! - [`AclCapabilities`] gates actions on what the device reports per stage
//! - [`RuleSequence`] keeps the total priority order within a table
//! - [`AclRangeCache`] shares L4 port-range objects across rules by value
//! - [`AclOrch`] owns the table/rule lifecycles and the only path to the
//!   programming client
//!
//! Rules move `Pending → Compiled → Validated → Applied`, or terminally to
//! `Rejected` (never programmed) or `Withdrawn`. Rejections are logged
//! local decisions; table-level failures surface to the configuration
//! source.

mod capability;
mod compiler;
mod orch;
mod range;
mod rule;
mod sequence;
mod table;
mod table_type;
mod types;

pub use capability::{AclCapabilities, AclStageCapabilities};
pub use compiler::{AclFieldValue, CompiledMatches, CompiledQualifier, QualifierCompiler};
pub use orch::{
    AclOrch, AclOrchConfig, AclOrchError, AclOrchStats, ACL_RULE_TABLE, ACL_TABLE_TABLE,
};
pub use range::{AclRangeCache, AclRangeProperties, AclRangeType};
pub use rule::{
    AclRule, AclRuleAction, AclRuleConfig, AclRuleState, RedirectDestination, RedirectTarget,
};
pub use sequence::{RuleSequence, SequenceKey};
pub use table::{AclTable, AclTableConfig, TableBinding};
pub use table_type::{
    builtin_table_types, create_l3_table_type, create_l3v6_table_type, AclTableType,
    AclTableTypeBuilder,
};
pub use types::{
    table_type_names, AclActionType, AclBindPointType, AclIpTypeValue, AclMatchField,
    AclPacketAction, AclPriority, AclRuleId, AclStage, AclTableId, RuleRejection,
};
