//! AclOrch - ACL table and rule orchestration.
//!
//! Owns the table and rule lifecycles and drives the other components:
//! compile (pure) → validate (capability, resolvers) → apply (programming
//! client). Events for the ACL namespace are processed strictly in arrival
//! order by the owning event loop; applies for one table are therefore
//! serialized, which is what keeps the priority-order invariants honest.
//!
//! Error discipline follows the configuration contract:
//!
//! - table-level failures (duplicate name, zero resolvable bind points,
//!   non-empty delete) are structural and surface as failed operations
//! - rule-level problems are local decisions: the rule is rejected, logged,
//!   and never reaches the forwarding plane, with no partial object left
//!   behind

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use aclorch_common::{
    Consumer, ConsumerConfig, HasRefCount, KeyOpFieldsValues, Operation, Orch, SyncMap,
    TaskStatus,
};
use aclorch_sai::api::acl::{attr, format_oid, format_oid_list, AclAsicApi, SaiAttr};
use aclorch_sai::{RawSaiObjectId, SaiError};

use crate::crm::AclResourceCounters;
use crate::neigh::NextHopRegistry;
use crate::ports::{BindPointId, PortEntry, PortRegistry};

use super::capability::AclCapabilities;
use super::compiler::QualifierCompiler;
use super::range::{AclRangeCache, AclRangeProperties};
use super::rule::{
    AclRule, AclRuleAction, AclRuleConfig, AclRuleState, RedirectDestination, RedirectTarget,
};
use super::table::{AclTable, AclTableConfig, TableBinding};
use super::table_type::{builtin_table_types, AclTableType};
use super::types::{AclBindPointType, AclRuleId, AclStage, AclTableId, RuleRejection};

/// Consumer table watched for table definitions.
pub const ACL_TABLE_TABLE: &str = "ACL_TABLE";
/// Consumer table watched for rule definitions.
pub const ACL_RULE_TABLE: &str = "ACL_RULE";

/// Error type for table-level (structural) failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AclOrchError {
    #[error("ACL table already exists: {0}")]
    DuplicateName(String),

    #[error("ACL table {0} still has rules")]
    TableNotEmpty(String),

    #[error("no bind point resolved; unknown ports: {0:?}")]
    UnknownPort(Vec<String>),

    #[error("ACL table not found: {0}")]
    TableNotFound(String),

    #[error("ACL table type not found: {0}")]
    TableTypeNotFound(String),

    #[error("invalid ACL configuration: {0}")]
    InvalidConfig(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error(transparent)]
    Sai(#[from] SaiError),
}

/// Configuration for AclOrch.
#[derive(Debug, Clone)]
pub struct AclOrchConfig {
    /// Minimum rule priority accepted.
    pub min_priority: u32,
    /// Maximum rule priority accepted.
    pub max_priority: u32,
    /// Maximum number of tables.
    pub max_tables: usize,
    /// Per-(stage, bind-point-kind) binding capacity reported by the device.
    pub binding_capacity: u32,
}

impl Default for AclOrchConfig {
    fn default() -> Self {
        Self {
            min_priority: 0,
            max_priority: 999_999,
            max_tables: 256,
            binding_capacity: 512,
        }
    }
}

/// Operation counters, exported for observability.
#[derive(Debug, Clone, Default)]
pub struct AclOrchStats {
    pub tables_created: u64,
    pub tables_deleted: u64,
    pub rules_applied: u64,
    pub rules_rejected: u64,
    pub rules_withdrawn: u64,
    pub programming_errors: u64,
}

/// A table-group on one bind point, shared by every table bound there.
#[derive(Debug)]
struct GroupEntry {
    group_oid: RawSaiObjectId,
    refs: u32,
}

impl HasRefCount for GroupEntry {
    fn increment_ref(&mut self) -> u32 {
        self.refs += 1;
        self.refs
    }

    fn decrement_ref(&mut self) -> Option<u32> {
        if self.refs == 0 {
            None
        } else {
            self.refs -= 1;
            Some(self.refs)
        }
    }

    fn ref_count(&self) -> u32 {
        self.refs
    }
}

/// ACL orchestration: table lifecycle, rule lifecycle, resource accounting.
pub struct AclOrch {
    config: AclOrchConfig,
    api: Arc<dyn AclAsicApi>,
    ports: Arc<PortRegistry>,
    next_hops: Arc<NextHopRegistry>,

    capabilities: AclCapabilities,
    table_types: BTreeMap<String, Arc<AclTableType>>,
    tables: SyncMap<AclTableId, AclTable>,
    /// Table-groups keyed by (bind point, stage).
    groups: SyncMap<(RawSaiObjectId, AclStage), GroupEntry>,
    range_cache: AclRangeCache,
    counters: AclResourceCounters,

    table_consumer: Consumer,
    rule_consumer: Consumer,
    stats: AclOrchStats,
}

impl AclOrch {
    pub fn new(
        api: Arc<dyn AclAsicApi>,
        ports: Arc<PortRegistry>,
        next_hops: Arc<NextHopRegistry>,
        config: AclOrchConfig,
    ) -> Self {
        let mut table_types = BTreeMap::new();
        for tt in builtin_table_types() {
            table_types.insert(tt.name.clone(), Arc::new(tt));
        }

        let counters = AclResourceCounters::with_capacity(config.binding_capacity);

        Self {
            config,
            api,
            ports,
            next_hops,
            capabilities: AclCapabilities::full_profile(),
            table_types,
            tables: SyncMap::new(),
            groups: SyncMap::new(),
            range_cache: AclRangeCache::new(),
            counters,
            table_consumer: Consumer::new(ConsumerConfig::new(ACL_TABLE_TABLE)),
            rule_consumer: Consumer::new(ConsumerConfig::new(ACL_RULE_TABLE).with_priority(1)),
            stats: AclOrchStats::default(),
        }
    }

    // ============ Capability state ============

    /// Replaces the device capability state atomically (never merges).
    /// Called at startup and again after a device re-initialization.
    pub fn set_capabilities(&mut self, capabilities: AclCapabilities) {
        info!(
            "refreshed ACL capabilities: ingress={:?} egress={:?}",
            capabilities.supported_actions(AclStage::Ingress),
            capabilities.supported_actions(AclStage::Egress)
        );
        self.capabilities = capabilities;
    }

    pub fn capabilities(&self) -> &AclCapabilities {
        &self.capabilities
    }

    // ============ Table type registry ============

    pub fn get_table_type(&self, name: &str) -> Option<Arc<AclTableType>> {
        self.table_types.get(name).cloned()
    }

    /// Registers a custom table type.
    pub fn register_table_type(&mut self, table_type: AclTableType) -> Result<(), AclOrchError> {
        if self.table_types.contains_key(&table_type.name) {
            return Err(AclOrchError::InvalidConfig(format!(
                "Table type {} already exists",
                table_type.name
            )));
        }
        self.table_types
            .insert(table_type.name.clone(), Arc::new(table_type));
        Ok(())
    }

    // ============ Table lifecycle ============

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_string())
    }

    pub fn get_table(&self, name: &str) -> Option<&AclTable> {
        self.tables.get(&name.to_string())
    }

    /// Creates a table and binds it to its ports/LAGs.
    ///
    /// One forwarding-plane table is created, plus one group membership per
    /// resolvable bind point (the group itself is created on first use).
    /// Binding counters move with each membership, never separately.
    pub fn create_table(&mut self, config: &AclTableConfig) -> Result<(), AclOrchError> {
        config.validate().map_err(AclOrchError::InvalidConfig)?;
        let name = config
            .name
            .clone()
            .ok_or_else(|| AclOrchError::InvalidConfig("Table name is required".to_string()))?;
        let type_name = config
            .type_name
            .clone()
            .ok_or_else(|| AclOrchError::InvalidConfig("Table type is required".to_string()))?;

        if self.tables.contains_key(&name) {
            return Err(AclOrchError::DuplicateName(name));
        }
        if self.tables.len() >= self.config.max_tables {
            return Err(AclOrchError::ResourceExhausted(format!(
                "table limit {} reached",
                self.config.max_tables
            )));
        }

        let table_type = self
            .table_types
            .get(&type_name)
            .cloned()
            .ok_or(AclOrchError::TableTypeNotFound(type_name.clone()))?;

        let stage = config.stage.unwrap_or_default();
        if !table_type.supports_stage(stage) {
            return Err(AclOrchError::InvalidConfig(format!(
                "table type {} does not support stage {}",
                type_name, stage
            )));
        }

        // At least one bind point must resolve; the rest are dropped loudly.
        let mut resolved: Vec<PortEntry> = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        for alias in &config.ports {
            match self.ports.get(alias) {
                Some(entry) => resolved.push(entry),
                None => unresolved.push(alias.clone()),
            }
        }
        if resolved.is_empty() {
            return Err(AclOrchError::UnknownPort(unresolved));
        }
        if !unresolved.is_empty() {
            warn!(
                "ACL table {}: skipping unresolvable bind points {:?}",
                name, unresolved
            );
        }

        let table_oid = self.api.create_acl_table(table_attrs(&table_type, stage))?;

        let mut table = AclTable::new(name.clone(), table_type, stage, table_oid);
        if let Some(desc) = &config.description {
            table.description = desc.clone();
        }

        for entry in resolved {
            match self.bind_table(table_oid, &entry, stage) {
                Ok(binding) => table.bindings.push(binding),
                Err(err) => {
                    error!("ACL table {}: binding {} failed: {}", name, entry.alias, err);
                    self.unwind_table(&table);
                    return Err(err);
                }
            }
        }

        info!("created {}", table);
        self.tables.insert(name, table);
        self.stats.tables_created += 1;
        Ok(())
    }

    /// Destroys a table, releasing every group membership and decrementing
    /// the binding counters symmetrically with creation.
    pub fn remove_table(&mut self, name: &str) -> Result<(), AclOrchError> {
        let key = name.to_string();
        let Some(table) = self.tables.remove(&key) else {
            return Err(AclOrchError::TableNotFound(key));
        };
        if !table.is_empty() {
            let err = AclOrchError::TableNotEmpty(key.clone());
            self.tables.insert(key, table);
            return Err(err);
        }

        for binding in &table.bindings {
            if let Err(err) = self.api.remove_acl_table_group_member(binding.member_oid) {
                error!(
                    "ACL table {}: failed to remove membership on {}: {}",
                    name, binding.alias, err
                );
            }
            self.counters.decrement(table.stage, binding.bind_point.kind());
            self.release_group(binding.bind_point, table.stage);
        }

        self.api.remove_acl_table(table.table_oid)?;
        self.stats.tables_deleted += 1;
        info!("removed ACL table {}", name);
        Ok(())
    }

    /// Attaches a table to one bind point, creating the point's group on
    /// first use. The counter increment is paired with the membership.
    fn bind_table(
        &mut self,
        table_oid: RawSaiObjectId,
        entry: &PortEntry,
        stage: AclStage,
    ) -> Result<TableBinding, AclOrchError> {
        let key = (entry.id.as_raw(), stage);
        let group_oid = match self.groups.get_mut(&key) {
            Some(group) => {
                group.increment_ref();
                group.group_oid
            }
            None => {
                let group_oid = self.api.create_acl_table_group(group_attrs(stage))?;
                let binding_attr = bind_point_attr(entry.id.kind(), stage);
                if let Err(err) = self.api.bind_acl_group(entry.id.as_raw(), binding_attr, group_oid)
                {
                    let _ = self.api.remove_acl_table_group(group_oid);
                    return Err(err.into());
                }
                self.groups.insert(key, GroupEntry { group_oid, refs: 1 });
                group_oid
            }
        };

        let member_oid = match self
            .api
            .create_acl_table_group_member(member_attrs(group_oid, table_oid))
        {
            Ok(oid) => oid,
            Err(err) => {
                self.release_group(entry.id, stage);
                return Err(err.into());
            }
        };

        self.counters.increment(stage, entry.id.kind());
        Ok(TableBinding {
            alias: entry.alias.clone(),
            bind_point: entry.id,
            group_oid,
            member_oid,
        })
    }

    /// Drops one table's reference to a bind point's group; the last
    /// reference detaches and destroys the group.
    fn release_group(&mut self, bind_point: BindPointId, stage: AclStage) {
        let key = (bind_point.as_raw(), stage);
        let remove_group = match self.groups.decrement_ref(&key) {
            Ok(0) => true,
            Ok(_) => false,
            Err(err) => {
                warn!("group accounting error on 0x{:x}: {}", bind_point.as_raw(), err);
                false
            }
        };
        if !remove_group {
            return;
        }
        if let Some(group) = self.groups.remove(&key) {
            let binding_attr = bind_point_attr(bind_point.kind(), stage);
            if let Err(err) = self.api.unbind_acl_group(bind_point.as_raw(), binding_attr) {
                warn!("failed to detach group from 0x{:x}: {}", bind_point.as_raw(), err);
            }
            if let Err(err) = self.api.remove_acl_table_group(group.group_oid) {
                warn!("failed to remove group 0x{:x}: {}", group.group_oid, err);
            }
        }
    }

    /// Rolls back a partially-created table so a failed creation leaves no
    /// forwarding-plane object behind.
    fn unwind_table(&mut self, table: &AclTable) {
        for binding in table.bindings.iter().rev() {
            if let Err(err) = self.api.remove_acl_table_group_member(binding.member_oid) {
                warn!("rollback: failed to remove membership: {}", err);
            }
            self.counters.decrement(table.stage, binding.bind_point.kind());
            self.release_group(binding.bind_point, table.stage);
        }
        if let Err(err) = self.api.remove_acl_table(table.table_oid) {
            warn!("rollback: failed to remove table: {}", err);
        }
    }

    // ============ Rule lifecycle ============

    /// Returns the total number of applied rules across all tables.
    pub fn applied_rule_count(&self) -> usize {
        self.tables.values().map(|t| t.rule_count()).sum()
    }

    pub fn get_rule(&self, table: &str, rule: &str) -> Option<&AclRule> {
        self.tables.get(&table.to_string())?.get_rule(rule)
    }

    /// Rule names of a table in evaluation order (highest priority first).
    pub fn evaluation_order(&self, table: &str) -> Vec<AclRuleId> {
        self.tables
            .get(&table.to_string())
            .map(|t| t.evaluation_order())
            .unwrap_or_default()
    }

    /// Number of shared range objects currently alive.
    pub fn shared_range_count(&self) -> usize {
        self.range_cache.len()
    }

    /// Processes a rule definition through the lifecycle:
    /// `Pending → Compiled → Validated → Applied`, or `Rejected`.
    ///
    /// A definition for an existing (table, name) replaces it: the old
    /// entry is withdrawn first. Returns the rule's final state; rejection
    /// is not an error.
    pub fn apply_rule(&mut self, config: &AclRuleConfig) -> Result<AclRuleState, AclOrchError> {
        config.validate().map_err(AclOrchError::InvalidConfig)?;

        let table_name = config.table.clone();
        let (stage, table_type, replacing) = match self.tables.get(&table_name) {
            Some(t) => (t.stage, Arc::clone(&t.table_type), t.has_rule(&config.name)),
            None => return Err(AclOrchError::TableNotFound(table_name)),
        };
        if replacing {
            self.withdraw_rule(&table_name, &config.name)?;
        }

        let priority = config
            .priority
            .ok_or_else(|| AclOrchError::InvalidConfig("Rule priority is required".to_string()))?;
        if priority < self.config.min_priority || priority > self.config.max_priority {
            return Err(AclOrchError::InvalidConfig(format!(
                "priority {} out of range {}-{}",
                priority, self.config.min_priority, self.config.max_priority
            )));
        }

        let action = config.effective_action();
        let mut rule = AclRule::new(&table_name, &config.name, priority, action.clone());

        // Pending → Compiled. Table-type legality rejects before any
        // capability or resolution checks.
        let compiled = QualifierCompiler::new(&table_type, &self.ports)
            .compile_all(&config.qualifiers);
        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(rejection) => return Ok(self.reject_rule(rule, rejection)),
        };
        if !compiled.dropped_ports.is_empty() {
            warn!(
                "ACL rule {}|{}: proceeding without unresolvable interfaces {:?}",
                table_name, config.name, compiled.dropped_ports
            );
        }
        rule.ranges = compiled.range_properties();
        rule.compiled = compiled.fields;
        rule.state = AclRuleState::Compiled;

        // Compiled → Validated.
        if let Err(rejection) = self.capabilities.validate_action(stage, action.action_type()) {
            return Ok(self.reject_rule(rule, rejection));
        }
        let unsupported_field = rule
            .compiled
            .iter()
            .map(|q| q.field)
            .find(|f| !self.capabilities.stage(stage).supports_match(*f));
        if let Some(field) = unsupported_field {
            return Ok(self.reject_rule(rule, RuleRejection::DisallowedQualifier(field)));
        }
        if let AclRuleAction::Redirect(target) = &action {
            match self.resolve_redirect(target) {
                Some(dest) => rule.redirect = Some(dest),
                None => {
                    let rejection = RuleRejection::UnresolvedTarget(target.to_string());
                    return Ok(self.reject_rule(rule, rejection));
                }
            }
        }
        rule.state = AclRuleState::Validated;

        // Validated → Applied. All-or-nothing: either the whole entry is
        // programmed or the acquired ranges are released and nothing is.
        match self.program_rule(&mut rule) {
            Ok(()) => {
                rule.state = AclRuleState::Applied;
                debug!("applied {}", rule);
                if let Some(table) = self.tables.get_mut(&table_name) {
                    table.insert_rule(rule);
                }
                self.stats.rules_applied += 1;
                Ok(AclRuleState::Applied)
            }
            Err(err) => {
                self.stats.programming_errors += 1;
                Err(err)
            }
        }
    }

    /// Withdraws a rule from any state, releasing its entry and any range
    /// objects it was the last reference to. Withdrawing a rule that was
    /// rejected (or never existed) is a no-op, not an error.
    pub fn withdraw_rule(
        &mut self,
        table_name: &str,
        rule_name: &str,
    ) -> Result<bool, AclOrchError> {
        let Some(table) = self.tables.get_mut(&table_name.to_string()) else {
            return Err(AclOrchError::TableNotFound(table_name.to_string()));
        };
        let Some(mut rule) = table.remove_rule(rule_name) else {
            debug!("delete of unknown ACL rule {}|{} ignored", table_name, rule_name);
            return Ok(false);
        };

        self.api.remove_acl_entry(rule.entry_oid)?;
        let ranges = std::mem::take(&mut rule.ranges);
        self.release_ranges(&ranges);

        rule.state = AclRuleState::Withdrawn;
        self.stats.rules_withdrawn += 1;
        debug!("withdrew {}", rule);
        Ok(true)
    }

    fn reject_rule(&mut self, mut rule: AclRule, rejection: RuleRejection) -> AclRuleState {
        rule.state = AclRuleState::Rejected;
        warn!("rejected {}: {}", rule, rejection);
        self.stats.rules_rejected += 1;
        AclRuleState::Rejected
    }

    /// Programs the compiled rule as one entry, acquiring shared range
    /// objects first and releasing them if the entry create fails.
    fn program_rule(&mut self, rule: &mut AclRule) -> Result<(), AclOrchError> {
        let table_oid = self
            .tables
            .get(&rule.table)
            .map(|t| t.table_oid)
            .ok_or_else(|| AclOrchError::TableNotFound(rule.table.clone()))?;

        let api = Arc::clone(&self.api);
        let mut range_oids = Vec::new();
        let mut acquired: Vec<AclRangeProperties> = Vec::new();
        for props in &rule.ranges {
            let created = self
                .range_cache
                .get_or_create(props.clone(), |p| api.create_acl_range(range_attrs(p)));
            match created {
                Ok(oid) => {
                    range_oids.push(oid);
                    acquired.push(props.clone());
                }
                Err(err) => {
                    self.release_ranges(&acquired);
                    return Err(err.into());
                }
            }
        }

        let mut attrs: Vec<SaiAttr> = vec![
            (attr::ENTRY_TABLE_ID.to_string(), format_oid(table_oid)),
            (attr::ENTRY_PRIORITY.to_string(), rule.priority.to_string()),
            (attr::ENTRY_ADMIN_STATE.to_string(), "true".to_string()),
        ];
        for qualifier in &rule.compiled {
            if let Some(field_attr) = qualifier.sai_attr() {
                attrs.push(field_attr);
            }
        }
        if !range_oids.is_empty() {
            attrs.push((
                attr::ENTRY_FIELD_ACL_RANGE_TYPE.to_string(),
                format_oid_list(&range_oids),
            ));
        }
        match (&rule.action, rule.redirect) {
            (AclRuleAction::Redirect(_), Some(dest)) => {
                attrs.push((
                    attr::ENTRY_ACTION_REDIRECT.to_string(),
                    format_oid(dest.as_raw()),
                ));
            }
            (action, _) => {
                if let Some(packet_action) = action.packet_action() {
                    attrs.push((
                        attr::ENTRY_ACTION_PACKET_ACTION.to_string(),
                        packet_action.sai_value().to_string(),
                    ));
                }
            }
        }

        match self.api.create_acl_entry(attrs) {
            Ok(entry_oid) => {
                rule.entry_oid = entry_oid;
                Ok(())
            }
            Err(err) => {
                self.release_ranges(&acquired);
                Err(err.into())
            }
        }
    }

    fn release_ranges(&mut self, ranges: &[AclRangeProperties]) {
        let api = Arc::clone(&self.api);
        for props in ranges {
            if let Err(err) = self
                .range_cache
                .release(props, |oid| api.remove_acl_range(oid))
            {
                warn!("failed to release range {}: {}", props, err);
            }
        }
    }

    fn resolve_redirect(&self, target: &RedirectTarget) -> Option<RedirectDestination> {
        match target {
            RedirectTarget::Interface(name) => self
                .ports
                .get(name)
                .map(|entry| RedirectDestination::Port(entry.id.as_raw())),
            RedirectTarget::NextHop(key) => self
                .next_hops
                .get(key)
                .map(|oid| RedirectDestination::NextHop(oid.as_raw())),
        }
    }

    // ============ Observability ============

    pub fn counters(&self) -> &AclResourceCounters {
        &self.counters
    }

    pub fn stats(&self) -> &AclOrchStats {
        &self.stats
    }

    // ============ Event handling ============

    /// Queues table-definition events for the next `do_task`.
    pub fn enqueue_table_events(&mut self, events: Vec<KeyOpFieldsValues>) {
        self.table_consumer.add_to_sync(events);
    }

    /// Queues rule-definition events for the next `do_task`.
    pub fn enqueue_rule_events(&mut self, events: Vec<KeyOpFieldsValues>) {
        self.rule_consumer.add_to_sync(events);
    }

    /// Handles one ACL_TABLE event.
    pub fn handle_table_event(&mut self, entry: &KeyOpFieldsValues) -> TaskStatus {
        match entry.op {
            Operation::Set => {
                let mut config = AclTableConfig::new().with_name(entry.key.clone());
                for (field, value) in &entry.fvs {
                    if let Err(err) = config.parse_field(field, value) {
                        error!("ACL_TABLE {}: {}", entry.key, err);
                        return TaskStatus::InvalidEntry;
                    }
                }
                match self.create_table(&config) {
                    Ok(()) => TaskStatus::Success,
                    Err(err) => {
                        error!("ACL_TABLE {}: {}", entry.key, err);
                        TaskStatus::Failed
                    }
                }
            }
            Operation::Del => match self.remove_table(&entry.key) {
                Ok(()) => TaskStatus::Success,
                Err(AclOrchError::TableNotFound(_)) => {
                    warn!("ACL_TABLE {}: delete of unknown table ignored", entry.key);
                    TaskStatus::Ignore
                }
                Err(err) => {
                    error!("ACL_TABLE {}: {}", entry.key, err);
                    TaskStatus::Failed
                }
            },
        }
    }

    /// Handles one ACL_RULE event (key form `TABLE|RULE`).
    pub fn handle_rule_event(&mut self, entry: &KeyOpFieldsValues) -> TaskStatus {
        let Some((table, rule)) = entry.key.split_once('|') else {
            error!("ACL_RULE {}: malformed key", entry.key);
            return TaskStatus::InvalidEntry;
        };

        match entry.op {
            Operation::Set => {
                let mut config = AclRuleConfig::new(table, rule);
                for (field, value) in &entry.fvs {
                    if let Err(err) = config.parse_field(field, value) {
                        error!("ACL_RULE {}: {}", entry.key, err);
                        return TaskStatus::InvalidEntry;
                    }
                }
                match self.apply_rule(&config) {
                    Ok(AclRuleState::Applied) => TaskStatus::Success,
                    Ok(_) => TaskStatus::Ignore,
                    Err(err) => {
                        error!("ACL_RULE {}: {}", entry.key, err);
                        TaskStatus::Failed
                    }
                }
            }
            Operation::Del => match self.withdraw_rule(table, rule) {
                Ok(_) => TaskStatus::Success,
                Err(AclOrchError::TableNotFound(_)) => {
                    warn!("ACL_RULE {}: delete on unknown table ignored", entry.key);
                    TaskStatus::Ignore
                }
                Err(err) => {
                    error!("ACL_RULE {}: {}", entry.key, err);
                    TaskStatus::Failed
                }
            },
        }
    }
}

#[async_trait]
impl Orch for AclOrch {
    fn name(&self) -> &str {
        "AclOrch"
    }

    async fn do_task(&mut self) {
        // Tables before rules: rules depend on their table existing.
        for entry in self.table_consumer.drain() {
            let status = self.handle_table_event(&entry);
            if status.is_failure() {
                error!("ACL_TABLE {}: operation did not take effect", entry.key);
            }
        }
        for entry in self.rule_consumer.drain() {
            let status = self.handle_rule_event(&entry);
            if status.is_failure() {
                error!("ACL_RULE {}: operation did not take effect", entry.key);
            }
        }
    }

    fn has_pending_tasks(&self) -> bool {
        self.table_consumer.has_pending() || self.rule_consumer.has_pending()
    }

    fn dump_pending_tasks(&self) -> Vec<String> {
        let mut dump = self.table_consumer.dump();
        dump.extend(self.rule_consumer.dump());
        dump
    }
}

impl std::fmt::Debug for AclOrch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclOrch")
            .field("tables", &self.tables.len())
            .field("groups", &self.groups.len())
            .field("ranges", &self.range_cache.len())
            .finish()
    }
}

// ============ Attribute builders ============

fn table_attrs(table_type: &AclTableType, stage: AclStage) -> Vec<SaiAttr> {
    let mut attrs = vec![
        (attr::TABLE_STAGE.to_string(), stage.sai_value().to_string()),
        (
            attr::TABLE_BIND_POINT_TYPE_LIST.to_string(),
            bind_point_list(&table_type.bind_points),
        ),
    ];
    let mut fields: Vec<String> = table_type.matches.iter().map(|f| f.sai_table_attr()).collect();
    fields.sort();
    fields.dedup();
    attrs.extend(fields.into_iter().map(|f| (f, "true".to_string())));
    attrs
}

fn group_attrs(stage: AclStage) -> Vec<SaiAttr> {
    vec![
        (attr::GROUP_STAGE.to_string(), stage.sai_value().to_string()),
        (
            attr::GROUP_BIND_POINT_TYPE_LIST.to_string(),
            bind_point_list(&[AclBindPointType::Port, AclBindPointType::Lag].into()),
        ),
        (
            attr::GROUP_TYPE.to_string(),
            attr::GROUP_TYPE_PARALLEL.to_string(),
        ),
    ]
}

fn member_attrs(group_oid: RawSaiObjectId, table_oid: RawSaiObjectId) -> Vec<SaiAttr> {
    vec![
        (attr::MEMBER_GROUP_ID.to_string(), format_oid(group_oid)),
        (attr::MEMBER_TABLE_ID.to_string(), format_oid(table_oid)),
        (attr::MEMBER_PRIORITY.to_string(), "100".to_string()),
    ]
}

fn range_attrs(props: &AclRangeProperties) -> Vec<SaiAttr> {
    vec![
        (
            attr::RANGE_TYPE.to_string(),
            props.range_type.sai_value().to_string(),
        ),
        (attr::RANGE_LIMIT.to_string(), props.limit_value()),
    ]
}

fn bind_point_list(bind_points: &HashSet<AclBindPointType>) -> String {
    let mut list: Vec<&str> = bind_points.iter().map(|bp| bp.sai_value()).collect();
    list.sort_unstable();
    list.join(",")
}

fn bind_point_attr(kind: AclBindPointType, stage: AclStage) -> &'static str {
    match (kind, stage) {
        (AclBindPointType::Port, AclStage::Ingress) => attr::PORT_INGRESS_ACL,
        (AclBindPointType::Port, AclStage::Egress) => attr::PORT_EGRESS_ACL,
        (AclBindPointType::Lag, AclStage::Ingress) => attr::LAG_INGRESS_ACL,
        (AclBindPointType::Lag, AclStage::Egress) => attr::LAG_EGRESS_ACL,
    }
}

#[cfg(test)]
mod tests {
    use super::super::capability::AclStageCapabilities;
    use super::super::types::AclActionType;
    use super::*;
    use aclorch_sai::api::acl::{InMemoryAclApi, SaiObjectType};
    use aclorch_sai::{LagOid, NextHopOid, PortOid};
    use pretty_assertions::assert_eq;

    struct Fixture {
        orch: AclOrch,
        api: Arc<InMemoryAclApi>,
        ports: Arc<PortRegistry>,
        next_hops: Arc<NextHopRegistry>,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(InMemoryAclApi::new());
        let ports = Arc::new(PortRegistry::new());
        ports.add_port("Ethernet0", PortOid::from_raw_unchecked(0x100));
        ports.add_port("Ethernet4", PortOid::from_raw_unchecked(0x101));
        ports.add_port("Ethernet8", PortOid::from_raw_unchecked(0x102));
        ports.add_lag("PortChannel0001", LagOid::from_raw_unchecked(0x200));
        let next_hops = Arc::new(NextHopRegistry::new());

        let orch = AclOrch::new(
            Arc::clone(&api) as Arc<dyn AclAsicApi>,
            Arc::clone(&ports),
            Arc::clone(&next_hops),
            AclOrchConfig::default(),
        );
        Fixture {
            orch,
            api,
            ports,
            next_hops,
        }
    }

    fn l3_table(ports: &[&str]) -> AclTableConfig {
        AclTableConfig::new()
            .with_name("DATAACL")
            .with_type("L3")
            .with_ports(ports.iter().copied())
    }

    fn drop_rule(name: &str, priority: u32) -> AclRuleConfig {
        AclRuleConfig::new("DATAACL", name)
            .with_priority(priority)
            .with_action(AclRuleAction::Drop)
            .with_qualifier(super::super::types::AclMatchField::L4SrcPort, "65000")
    }

    #[test]
    fn test_create_and_remove_table_roundtrip() {
        let mut f = fixture();
        f.orch
            .create_table(&l3_table(&["Ethernet0", "Ethernet4", "PortChannel0001"]))
            .unwrap();

        assert_eq!(f.orch.table_count(), 1);
        assert_eq!(f.api.count(SaiObjectType::AclTable), 1);
        assert_eq!(f.api.count(SaiObjectType::AclTableGroup), 3);
        assert_eq!(f.api.count(SaiObjectType::AclTableGroupMember), 3);
        assert_eq!(
            f.orch.counters().used(AclStage::Ingress, AclBindPointType::Port),
            2
        );
        assert_eq!(
            f.orch.counters().used(AclStage::Ingress, AclBindPointType::Lag),
            1
        );

        f.orch.remove_table("DATAACL").unwrap();
        assert_eq!(f.orch.table_count(), 0);
        assert_eq!(f.api.total_objects(), 0);
        assert_eq!(
            f.orch.counters().used(AclStage::Ingress, AclBindPointType::Port),
            0
        );
        assert_eq!(
            f.orch.counters().used(AclStage::Ingress, AclBindPointType::Lag),
            0
        );
    }

    #[test]
    fn test_duplicate_table_name() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0"])).unwrap();
        assert!(matches!(
            f.orch.create_table(&l3_table(&["Ethernet4"])),
            Err(AclOrchError::DuplicateName(_))
        ));
        // The failed create left nothing behind.
        assert_eq!(f.api.count(SaiObjectType::AclTable), 1);
    }

    #[test]
    fn test_table_with_no_resolvable_ports() {
        let mut f = fixture();
        let result = f.orch.create_table(&l3_table(&["FOO", "BAR"]));
        assert!(matches!(result, Err(AclOrchError::UnknownPort(_))));
        assert_eq!(f.api.total_objects(), 0);
    }

    #[test]
    fn test_table_with_partially_resolvable_ports() {
        let mut f = fixture();
        f.orch
            .create_table(&l3_table(&["Ethernet0", "NO_SUCH_PORT"]))
            .unwrap();

        let table = f.orch.get_table("DATAACL").unwrap();
        assert_eq!(table.bound_aliases(), vec!["Ethernet0"]);
        assert_eq!(f.api.count(SaiObjectType::AclTableGroupMember), 1);
    }

    #[test]
    fn test_groups_shared_between_tables() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0"])).unwrap();
        f.orch
            .create_table(
                &AclTableConfig::new()
                    .with_name("DATAACL_V6")
                    .with_type("L3V6")
                    .with_ports(["Ethernet0"]),
            )
            .unwrap();

        // One group on the port, two memberships.
        assert_eq!(f.api.count(SaiObjectType::AclTableGroup), 1);
        assert_eq!(f.api.count(SaiObjectType::AclTableGroupMember), 2);

        // Removing one table keeps the shared group alive.
        f.orch.remove_table("DATAACL").unwrap();
        assert_eq!(f.api.count(SaiObjectType::AclTableGroup), 1);

        f.orch.remove_table("DATAACL_V6").unwrap();
        assert_eq!(f.api.count(SaiObjectType::AclTableGroup), 0);
    }

    #[test]
    fn test_remove_nonempty_table_fails() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0"])).unwrap();
        f.orch.apply_rule(&drop_rule("RULE_1", 10)).unwrap();

        assert!(matches!(
            f.orch.remove_table("DATAACL"),
            Err(AclOrchError::TableNotEmpty(_))
        ));
        assert_eq!(f.orch.table_count(), 1);

        f.orch.withdraw_rule("DATAACL", "RULE_1").unwrap();
        f.orch.remove_table("DATAACL").unwrap();
    }

    #[test]
    fn test_rule_apply_and_withdraw() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0"])).unwrap();

        let state = f.orch.apply_rule(&drop_rule("RULE_1", 10)).unwrap();
        assert_eq!(state, AclRuleState::Applied);
        assert_eq!(f.api.count(SaiObjectType::AclEntry), 1);
        assert!(f.orch.get_rule("DATAACL", "RULE_1").unwrap().is_applied());

        assert!(f.orch.withdraw_rule("DATAACL", "RULE_1").unwrap());
        assert_eq!(f.api.count(SaiObjectType::AclEntry), 0);
        // A second delete is a no-op, not an error.
        assert!(!f.orch.withdraw_rule("DATAACL", "RULE_1").unwrap());
    }

    #[test]
    fn test_rule_replacement_withdraws_old_entry() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0"])).unwrap();

        f.orch.apply_rule(&drop_rule("RULE_1", 10)).unwrap();
        f.orch.apply_rule(&drop_rule("RULE_1", 20)).unwrap();

        assert_eq!(f.api.count(SaiObjectType::AclEntry), 1);
        assert_eq!(f.orch.get_rule("DATAACL", "RULE_1").unwrap().priority, 20);
        assert_eq!(f.orch.stats().rules_withdrawn, 1);
    }

    #[test]
    fn test_rejected_rule_programs_nothing() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0"])).unwrap();

        let config = AclRuleConfig::new("DATAACL", "RULE_1")
            .with_priority(10)
            .with_qualifier(super::super::types::AclMatchField::Ipv6NextHeader, "6");
        let state = f.orch.apply_rule(&config).unwrap();

        assert_eq!(state, AclRuleState::Rejected);
        assert_eq!(f.api.count(SaiObjectType::AclEntry), 0);
        assert!(f.orch.get_rule("DATAACL", "RULE_1").is_none());
        assert_eq!(f.orch.stats().rules_rejected, 1);
    }

    #[test]
    fn test_capability_gating_until_refresh() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0"])).unwrap();
        f.orch.set_capabilities(AclCapabilities::new(
            AclStageCapabilities::with_actions([AclActionType::Redirect]),
            AclStageCapabilities::full(),
        ));

        // Packet actions are unsupported at ingress; resubmission does not
        // help until the capability state is refreshed.
        for _ in 0..3 {
            let state = f.orch.apply_rule(&drop_rule("RULE_1", 10)).unwrap();
            assert_eq!(state, AclRuleState::Rejected);
        }
        assert_eq!(f.api.count(SaiObjectType::AclEntry), 0);

        f.orch.set_capabilities(AclCapabilities::full_profile());
        let state = f.orch.apply_rule(&drop_rule("RULE_1", 10)).unwrap();
        assert_eq!(state, AclRuleState::Applied);
    }

    #[test]
    fn test_redirect_requires_existing_next_hop() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0", "Ethernet4"])).unwrap();

        let config = AclRuleConfig::new("DATAACL", "RULE_1")
            .with_priority(20)
            .with_action(AclRuleAction::Redirect(
                "10.0.0.2@Ethernet4".parse().unwrap(),
            ));
        // The adjacency does not exist yet: fail fast, no waiting.
        let state = f.orch.apply_rule(&config).unwrap();
        assert_eq!(state, AclRuleState::Rejected);

        // Once neighbor resolution installs the next-hop, the same
        // definition applies.
        f.next_hops.install(
            "10.0.0.2@Ethernet4".parse().unwrap(),
            "00:01:02:03:04:05".parse().unwrap(),
            NextHopOid::from_raw_unchecked(0x4000),
        );
        let state = f.orch.apply_rule(&config).unwrap();
        assert_eq!(state, AclRuleState::Applied);

        let rule = f.orch.get_rule("DATAACL", "RULE_1").unwrap();
        assert_eq!(rule.redirect, Some(RedirectDestination::NextHop(0x4000)));
    }

    #[test]
    fn test_redirect_to_bare_interface() {
        let mut f = fixture();
        f.orch.create_table(&l3_table(&["Ethernet0", "Ethernet4"])).unwrap();

        let config = AclRuleConfig::new("DATAACL", "RULE_1")
            .with_priority(20)
            .with_action(AclRuleAction::Redirect(RedirectTarget::Interface(
                "Ethernet4".to_string(),
            )));
        f.orch.apply_rule(&config).unwrap();

        let rule = f.orch.get_rule("DATAACL", "RULE_1").unwrap();
        assert_eq!(rule.redirect, Some(RedirectDestination::Port(0x101)));
    }

    #[test]
    fn test_rule_for_unknown_table_is_structural_error() {
        let mut f = fixture();
        let result = f.orch.apply_rule(&drop_rule("RULE_1", 10));
        assert!(matches!(result, Err(AclOrchError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_event_loop_processing() {
        let mut f = fixture();
        f.orch.enqueue_table_events(vec![KeyOpFieldsValues::set(
            "DATAACL",
            vec![
                ("TYPE".to_string(), "L3".to_string()),
                ("PORTS".to_string(), "Ethernet0,Ethernet4".to_string()),
            ],
        )]);
        f.orch.enqueue_rule_events(vec![KeyOpFieldsValues::set(
            "DATAACL|RULE_1",
            vec![
                ("PRIORITY".to_string(), "55".to_string()),
                ("PACKET_ACTION".to_string(), "DROP".to_string()),
                ("L4_DST_PORT".to_string(), "443".to_string()),
            ],
        )]);

        assert!(f.orch.has_pending_tasks());
        f.orch.do_task().await;
        assert!(!f.orch.has_pending_tasks());

        assert_eq!(f.orch.table_count(), 1);
        assert_eq!(f.orch.applied_rule_count(), 1);

        f.orch
            .enqueue_rule_events(vec![KeyOpFieldsValues::del("DATAACL|RULE_1")]);
        f.orch.do_task().await;
        assert_eq!(f.orch.applied_rule_count(), 0);

        f.orch.enqueue_table_events(vec![KeyOpFieldsValues::del("DATAACL")]);
        f.orch.do_task().await;
        assert_eq!(f.orch.table_count(), 0);
    }

    #[test]
    fn test_ports_registry_is_shared() {
        let f = fixture();
        assert_eq!(f.ports.len(), 4);
    }
}
