//! ACL tables: configuration form and installed state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use aclorch_sai::RawSaiObjectId;

use crate::ports::BindPointId;

use super::rule::AclRule;
use super::sequence::RuleSequence;
use super::table_type::AclTableType;
use super::types::{AclRuleId, AclStage, AclTableId};

/// Table definition as delivered by the configuration source.
#[derive(Debug, Clone, Default)]
pub struct AclTableConfig {
    /// Table name (unique).
    pub name: Option<String>,
    /// Table type name (e.g., "L3", "L3V6").
    pub type_name: Option<String>,
    /// Stage; defaults to ingress when omitted.
    pub stage: Option<AclStage>,
    /// Port/LAG names to bind, fixed at creation.
    pub ports: Vec<String>,
    /// Free-form description.
    pub description: Option<String>,
}

impl AclTableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_stage(mut self, stage: AclStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ports = ports.into_iter().map(Into::into).collect();
        self
    }

    /// Parses one configuration field. Unknown fields are ignored for
    /// forward compatibility.
    pub fn parse_field(&mut self, field: &str, value: &str) -> Result<(), String> {
        match field.to_uppercase().as_str() {
            "TYPE" => self.type_name = Some(value.to_string()),
            "STAGE" => self.stage = Some(value.parse()?),
            "PORTS" | "PORTS@" => {
                self.ports = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "POLICY_DESC" | "DESCRIPTION" => self.description = Some(value.to_string()),
            _ => {}
        }
        Ok(())
    }

    /// Validates the definition is complete enough to process.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().unwrap_or("").is_empty() {
            return Err("Table name is required".to_string());
        }
        if self.type_name.is_none() {
            return Err("Table type is required".to_string());
        }
        if self.ports.is_empty() {
            return Err("Table must bind at least one port".to_string());
        }
        Ok(())
    }
}

/// One bound port/LAG and the table-group membership attaching the table
/// to it.
#[derive(Debug, Clone)]
pub struct TableBinding {
    /// Interface name.
    pub alias: String,
    /// Forwarding-plane bind point.
    pub bind_point: BindPointId,
    /// Table-group on the bind point (shared across tables).
    pub group_oid: RawSaiObjectId,
    /// This table's membership in the group.
    pub member_oid: RawSaiObjectId,
}

/// An installed ACL table.
///
/// The bound-port set is fixed at creation. The table owns its rules and
/// their evaluation order; it cannot be destroyed while rules remain.
#[derive(Debug)]
pub struct AclTable {
    pub name: AclTableId,
    pub table_type: Arc<AclTableType>,
    pub stage: AclStage,
    pub description: String,
    /// Forwarding-plane table object.
    pub table_oid: RawSaiObjectId,
    /// Bind points in configuration order.
    pub bindings: Vec<TableBinding>,
    /// Applied rules by name.
    rules: HashMap<AclRuleId, AclRule>,
    /// Evaluation order of the applied rules.
    sequence: RuleSequence,
}

impl AclTable {
    pub fn new(
        name: impl Into<String>,
        table_type: Arc<AclTableType>,
        stage: AclStage,
        table_oid: RawSaiObjectId,
    ) -> Self {
        Self {
            name: name.into(),
            table_type,
            stage,
            description: String::new(),
            table_oid,
            bindings: Vec::new(),
            rules: HashMap::new(),
            sequence: RuleSequence::new(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn get_rule(&self, name: &str) -> Option<&AclRule> {
        self.rules.get(name)
    }

    /// Installs an applied rule and assigns its place in the evaluation
    /// order.
    pub fn insert_rule(&mut self, mut rule: AclRule) {
        let key = self.sequence.insert(rule.name.clone(), rule.priority);
        rule.sequence_key = Some(key);
        self.rules.insert(rule.name.clone(), rule);
    }

    /// Removes a rule, releasing its place in the evaluation order.
    pub fn remove_rule(&mut self, name: &str) -> Option<AclRule> {
        let rule = self.rules.remove(name)?;
        if let Some(key) = &rule.sequence_key {
            self.sequence.remove(key);
        }
        Some(rule)
    }

    /// Rule names in evaluation order (highest priority first).
    pub fn evaluation_order(&self) -> Vec<AclRuleId> {
        self.sequence.evaluation_order()
    }

    /// Names of all bound interfaces, in configuration order.
    pub fn bound_aliases(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.alias.clone()).collect()
    }
}

impl fmt::Display for AclTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AclTable({}, type={}, stage={}, rules={}, bindings={})",
            self.name,
            self.table_type.name,
            self.stage,
            self.rules.len(),
            self.bindings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::rule::AclRuleAction;
    use super::super::table_type::create_l3_table_type;
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> AclTable {
        AclTable::new(
            "DATAACL",
            Arc::new(create_l3_table_type()),
            AclStage::Ingress,
            0x7000,
        )
    }

    #[test]
    fn test_config_parse() {
        let mut config = AclTableConfig::new().with_name("DATAACL");
        config.parse_field("TYPE", "L3").unwrap();
        config.parse_field("STAGE", "EGRESS").unwrap();
        config.parse_field("PORTS", "Ethernet0, Ethernet4").unwrap();
        config.parse_field("POLICY_DESC", "data plane acl").unwrap();
        config.parse_field("UNKNOWN_FIELD", "x").unwrap();

        assert_eq!(config.type_name, Some("L3".to_string()));
        assert_eq!(config.stage, Some(AclStage::Egress));
        assert_eq!(config.ports, vec!["Ethernet0", "Ethernet4"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(AclTableConfig::new().validate().is_err());
        assert!(AclTableConfig::new()
            .with_name("T")
            .with_type("L3")
            .validate()
            .is_err()); // no ports
        assert!(AclTableConfig::new()
            .with_name("T")
            .with_type("L3")
            .with_ports(["Ethernet0"])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rule_bookkeeping() {
        let mut table = table();
        assert!(table.is_empty());

        table.insert_rule(AclRule::new("DATAACL", "RULE_1", 10, AclRuleAction::Drop));
        table.insert_rule(AclRule::new("DATAACL", "RULE_2", 20, AclRuleAction::Forward));

        assert_eq!(table.rule_count(), 2);
        assert!(table.has_rule("RULE_1"));
        assert_eq!(table.evaluation_order(), vec!["RULE_2", "RULE_1"]);

        let removed = table.remove_rule("RULE_2").unwrap();
        assert_eq!(removed.name, "RULE_2");
        assert_eq!(table.evaluation_order(), vec!["RULE_1"]);
        assert!(table.remove_rule("RULE_2").is_none());
    }

    #[test]
    fn test_sequence_key_assigned_on_insert() {
        let mut table = table();
        table.insert_rule(AclRule::new("DATAACL", "RULE_1", 10, AclRuleAction::Drop));
        assert!(table.get_rule("RULE_1").unwrap().sequence_key.is_some());
    }
}
