//! ACL rules: configuration form, lifecycle state, and applied form.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use aclorch_sai::RawSaiObjectId;

use crate::neigh::NextHopKey;

use super::compiler::CompiledQualifier;
use super::range::AclRangeProperties;
use super::sequence::SequenceKey;
use super::types::{
    AclActionType, AclMatchField, AclPacketAction, AclPriority, AclRuleId, AclTableId,
};

/// Lifecycle state of a rule.
///
/// Happy path is `Pending → Compiled → Validated → Applied`. `Rejected` is
/// terminal and leaves no forwarding-plane object; `Withdrawn` is terminal
/// after releasing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AclRuleState {
    #[default]
    Pending,
    Compiled,
    Validated,
    Applied,
    Rejected,
    Withdrawn,
}

impl fmt::Display for AclRuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Compiled => "COMPILED",
            Self::Validated => "VALIDATED",
            Self::Applied => "APPLIED",
            Self::Rejected => "REJECTED",
            Self::Withdrawn => "WITHDRAWN",
        };
        write!(f, "{}", s)
    }
}

/// Redirect target as configured: a bare interface, or an adjacency on one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Redirect to an interface's forwarding object.
    Interface(String),
    /// Redirect to the next-hop for `ip@interface`.
    NextHop(NextHopKey),
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface(name) => write!(f, "{}", name),
            Self::NextHop(key) => write!(f, "{}", key),
        }
    }
}

impl FromStr for RedirectTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty redirect target".to_string());
        }
        if s.contains('@') {
            Ok(Self::NextHop(s.parse()?))
        } else {
            Ok(Self::Interface(s.to_string()))
        }
    }
}

/// Resolved redirect destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectDestination {
    /// The next-hop object for an adjacency.
    NextHop(RawSaiObjectId),
    /// An interface's port/LAG object.
    Port(RawSaiObjectId),
}

impl RedirectDestination {
    pub fn as_raw(&self) -> RawSaiObjectId {
        match self {
            Self::NextHop(oid) | Self::Port(oid) => *oid,
        }
    }
}

/// Action a rule takes on matching packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclRuleAction {
    Forward,
    Drop,
    Redirect(RedirectTarget),
}

impl AclRuleAction {
    /// The action kind, for capability gating.
    pub fn action_type(&self) -> AclActionType {
        match self {
            Self::Forward | Self::Drop => AclActionType::PacketAction,
            Self::Redirect(_) => AclActionType::Redirect,
        }
    }

    /// The packet action, if this is one.
    pub fn packet_action(&self) -> Option<AclPacketAction> {
        match self {
            Self::Forward => Some(AclPacketAction::Forward),
            Self::Drop => Some(AclPacketAction::Drop),
            Self::Redirect(_) => None,
        }
    }
}

impl fmt::Display for AclRuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "FORWARD"),
            Self::Drop => write!(f, "DROP"),
            Self::Redirect(target) => write!(f, "REDIRECT:{}", target),
        }
    }
}

/// Rule definition as delivered by the configuration source.
#[derive(Debug, Clone, Default)]
pub struct AclRuleConfig {
    /// Owning table name.
    pub table: AclTableId,
    /// Rule name, unique within the table.
    pub name: AclRuleId,
    /// Priority (higher = evaluated first).
    pub priority: Option<AclPriority>,
    /// Action; defaults to FORWARD when omitted.
    pub action: Option<AclRuleAction>,
    /// Raw qualifier values keyed by parsed field name.
    pub qualifiers: BTreeMap<AclMatchField, String>,
}

impl AclRuleConfig {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: AclPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_action(mut self, action: AclRuleAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_qualifier(mut self, field: AclMatchField, value: impl Into<String>) -> Self {
        self.qualifiers.insert(field, value.into());
        self
    }

    /// Parses one configuration field.
    ///
    /// Unknown field names are a configuration-schema error: the entry is
    /// dropped upstream, it never reaches compilation.
    pub fn parse_field(&mut self, field: &str, value: &str) -> Result<(), String> {
        match field.to_uppercase().as_str() {
            "PRIORITY" => {
                let priority: AclPriority = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("Invalid priority: {}", value))?;
                self.priority = Some(priority);
            }
            "PACKET_ACTION" => {
                let action: AclPacketAction = value.parse()?;
                self.action = Some(match action {
                    AclPacketAction::Forward => AclRuleAction::Forward,
                    AclPacketAction::Drop => AclRuleAction::Drop,
                });
            }
            "REDIRECT_ACTION" => {
                self.action = Some(AclRuleAction::Redirect(value.parse()?));
            }
            name => {
                let field: AclMatchField = name.parse()?;
                self.qualifiers.insert(field, value.to_string());
            }
        }
        Ok(())
    }

    /// Validates the definition is complete enough to process.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Rule name is required".to_string());
        }
        if self.table.is_empty() {
            return Err("Rule table is required".to_string());
        }
        if self.priority.is_none() {
            return Err("Rule priority is required".to_string());
        }
        Ok(())
    }

    /// The effective action (FORWARD when none was configured).
    pub fn effective_action(&self) -> AclRuleAction {
        self.action.clone().unwrap_or(AclRuleAction::Forward)
    }
}

/// An applied rule and the forwarding-plane state it owns.
#[derive(Debug, Clone)]
pub struct AclRule {
    pub name: AclRuleId,
    pub table: AclTableId,
    pub priority: AclPriority,
    pub action: AclRuleAction,
    pub state: AclRuleState,
    /// Compiled match fields, in programming order.
    pub compiled: Vec<CompiledQualifier>,
    /// Resolved redirect destination, for redirect rules.
    pub redirect: Option<RedirectDestination>,
    /// Shared range objects this rule references.
    pub ranges: Vec<AclRangeProperties>,
    /// Forwarding-plane entry object (0 until applied).
    pub entry_oid: RawSaiObjectId,
    /// Position in the table's evaluation order (set when applied).
    pub sequence_key: Option<SequenceKey>,
}

impl AclRule {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        priority: AclPriority,
        action: AclRuleAction,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            priority,
            action,
            state: AclRuleState::default(),
            compiled: Vec::new(),
            redirect: None,
            ranges: Vec::new(),
            entry_oid: 0,
            sequence_key: None,
        }
    }

    /// Returns true once the rule owns a forwarding-plane entry.
    pub fn is_applied(&self) -> bool {
        self.state == AclRuleState::Applied && self.entry_oid != 0
    }
}

impl fmt::Display for AclRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AclRule({}|{}, priority={}, action={}, fields={}, state={})",
            self.table,
            self.name,
            self.priority,
            self.action,
            self.compiled.len(),
            self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_redirect_target_parse() {
        let target: RedirectTarget = "Ethernet4".parse().unwrap();
        assert_eq!(target, RedirectTarget::Interface("Ethernet4".to_string()));

        let target: RedirectTarget = "10.0.0.2@Ethernet4".parse().unwrap();
        match &target {
            RedirectTarget::NextHop(key) => assert_eq!(key.interface, "Ethernet4"),
            other => panic!("unexpected target {:?}", other),
        }

        assert!("".parse::<RedirectTarget>().is_err());
        assert!("bogus@Ethernet4".parse::<RedirectTarget>().is_err());
    }

    #[test]
    fn test_config_parse_fields() {
        let mut config = AclRuleConfig::new("DATAACL", "RULE_1");
        config.parse_field("PRIORITY", "100").unwrap();
        config.parse_field("PACKET_ACTION", "DROP").unwrap();
        config.parse_field("L4_SRC_PORT", "65000").unwrap();
        config.parse_field("SRC_IP", "10.0.0.0/24").unwrap();

        assert_eq!(config.priority, Some(100));
        assert_eq!(config.action, Some(AclRuleAction::Drop));
        assert_eq!(config.qualifiers.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_redirect() {
        let mut config = AclRuleConfig::new("DATAACL", "RULE_1");
        config
            .parse_field("REDIRECT_ACTION", "10.0.0.2@Ethernet4")
            .unwrap();
        assert_eq!(config.effective_action().action_type(), AclActionType::Redirect);
    }

    #[test]
    fn test_config_rejects_unknown_field() {
        let mut config = AclRuleConfig::new("DATAACL", "RULE_1");
        assert!(config.parse_field("NO_SUCH_QUALIFIER", "1").is_err());
        assert!(config.parse_field("PRIORITY", "abc").is_err());
    }

    #[test]
    fn test_config_validation() {
        let config = AclRuleConfig::new("DATAACL", "RULE_1");
        // Missing priority.
        assert!(config.validate().is_err());

        let config = config.with_priority(10);
        assert!(config.validate().is_ok());
        // Action defaults to forward.
        assert_eq!(config.effective_action(), AclRuleAction::Forward);
    }

    #[test]
    fn test_rule_state_default() {
        let rule = AclRule::new("DATAACL", "RULE_1", 10, AclRuleAction::Forward);
        assert_eq!(rule.state, AclRuleState::Pending);
        assert!(!rule.is_applied());
    }

    #[test]
    fn test_action_types() {
        assert_eq!(
            AclRuleAction::Forward.action_type(),
            AclActionType::PacketAction
        );
        assert_eq!(AclRuleAction::Drop.action_type(), AclActionType::PacketAction);
        assert_eq!(
            AclRuleAction::Redirect(RedirectTarget::Interface("Ethernet0".into())).action_type(),
            AclActionType::Redirect
        );
        assert_eq!(
            AclRuleAction::Drop.packet_action(),
            Some(AclPacketAction::Drop)
        );
    }
}
