//! ACL table type definitions.
//!
//! A table type fixes the legal qualifier set, the legal actions, the bind
//! points, and (optionally) the stages for tables of that type. The built-in
//! types are immutable and loaded at startup; additional types can be
//! registered through the builder.

use std::collections::HashSet;
use std::fmt;

use super::types::{AclActionType, AclBindPointType, AclMatchField, AclStage};

/// ACL table type definition.
#[derive(Debug, Clone)]
pub struct AclTableType {
    /// Type name (e.g., "L3", "L3V6").
    pub name: String,
    /// Supported bind point kinds.
    pub bind_points: HashSet<AclBindPointType>,
    /// Supported match fields.
    pub matches: HashSet<AclMatchField>,
    /// Supported actions.
    pub actions: HashSet<AclActionType>,
    /// Supported stages; empty means both.
    pub stages: HashSet<AclStage>,
    /// Whether this is a built-in type.
    pub is_builtin: bool,
}

impl AclTableType {
    /// Returns true if this type supports the given match field.
    pub fn supports_match(&self, field: AclMatchField) -> bool {
        self.matches.contains(&field)
    }

    /// Returns true if this type supports the given action.
    pub fn supports_action(&self, action: AclActionType) -> bool {
        self.actions.contains(&action)
    }

    /// Returns true if this type supports the given bind point kind.
    pub fn supports_bind_point(&self, bp: AclBindPointType) -> bool {
        self.bind_points.contains(&bp)
    }

    /// Returns true if this type supports the given stage.
    pub fn supports_stage(&self, stage: AclStage) -> bool {
        self.stages.is_empty() || self.stages.contains(&stage)
    }

    /// Returns true if tables of this type match IPv6 headers.
    ///
    /// Drives the protocol/next-header duality in the compiler: on a
    /// v6-capable table `IP_PROTOCOL` compiles to the next-header field.
    pub fn is_v6(&self) -> bool {
        self.matches.contains(&AclMatchField::Ipv6NextHeader)
    }
}

impl fmt::Display for AclTableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AclTableType({}, matches={}, actions={}, bind_points={})",
            self.name,
            self.matches.len(),
            self.actions.len(),
            self.bind_points.len()
        )
    }
}

/// Builder for ACL table types.
#[derive(Debug, Clone, Default)]
pub struct AclTableTypeBuilder {
    name: Option<String>,
    bind_points: HashSet<AclBindPointType>,
    matches: HashSet<AclMatchField>,
    actions: HashSet<AclActionType>,
    stages: HashSet<AclStage>,
    is_builtin: bool,
}

impl AclTableTypeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_bind_points(mut self, bps: impl IntoIterator<Item = AclBindPointType>) -> Self {
        self.bind_points.extend(bps);
        self
    }

    pub fn with_match(mut self, field: AclMatchField) -> Self {
        self.matches.insert(field);
        self
    }

    pub fn with_matches(mut self, fields: impl IntoIterator<Item = AclMatchField>) -> Self {
        self.matches.extend(fields);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = AclActionType>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn with_stage(mut self, stage: AclStage) -> Self {
        self.stages.insert(stage);
        self
    }

    pub fn builtin(mut self) -> Self {
        self.is_builtin = true;
        self
    }

    pub fn build(self) -> Result<AclTableType, String> {
        let name = self.name.ok_or("Table type name is required")?;

        if self.bind_points.is_empty() {
            return Err("At least one bind point is required".to_string());
        }

        if self.matches.is_empty() {
            return Err("At least one match field is required".to_string());
        }

        Ok(AclTableType {
            name,
            bind_points: self.bind_points,
            matches: self.matches,
            actions: self.actions,
            stages: self.stages,
            is_builtin: self.is_builtin,
        })
    }
}

/// Creates the built-in L3 (IPv4) table type.
pub fn create_l3_table_type() -> AclTableType {
    AclTableTypeBuilder::new()
        .with_name(super::types::table_type_names::L3)
        .with_bind_points([AclBindPointType::Port, AclBindPointType::Lag])
        .with_matches([
            AclMatchField::SrcIp,
            AclMatchField::DstIp,
            AclMatchField::EtherType,
            AclMatchField::IpProtocol,
            AclMatchField::TcpFlags,
            AclMatchField::IcmpType,
            AclMatchField::IcmpCode,
            AclMatchField::L4SrcPort,
            AclMatchField::L4DstPort,
            AclMatchField::L4SrcPortRange,
            AclMatchField::L4DstPortRange,
            AclMatchField::OuterVlanId,
            AclMatchField::AclIpType,
            AclMatchField::InPorts,
            AclMatchField::OutPorts,
        ])
        .with_actions([
            AclActionType::PacketAction,
            AclActionType::Redirect,
            AclActionType::Counter,
        ])
        .builtin()
        .build()
        .expect("L3 table type should be valid")
}

/// Creates the built-in L3V6 (IPv6) table type.
pub fn create_l3v6_table_type() -> AclTableType {
    AclTableTypeBuilder::new()
        .with_name(super::types::table_type_names::L3V6)
        .with_bind_points([AclBindPointType::Port, AclBindPointType::Lag])
        .with_matches([
            AclMatchField::SrcIpv6,
            AclMatchField::DstIpv6,
            AclMatchField::EtherType,
            AclMatchField::Ipv6NextHeader,
            AclMatchField::TcpFlags,
            AclMatchField::Icmpv6Type,
            AclMatchField::Icmpv6Code,
            AclMatchField::L4SrcPort,
            AclMatchField::L4DstPort,
            AclMatchField::L4SrcPortRange,
            AclMatchField::L4DstPortRange,
            AclMatchField::OuterVlanId,
            AclMatchField::AclIpType,
            AclMatchField::InPorts,
            AclMatchField::OutPorts,
        ])
        .with_actions([
            AclActionType::PacketAction,
            AclActionType::Redirect,
            AclActionType::Counter,
        ])
        .builtin()
        .build()
        .expect("L3V6 table type should be valid")
}

/// Returns all built-in table types.
pub fn builtin_table_types() -> Vec<AclTableType> {
    vec![create_l3_table_type(), create_l3v6_table_type()]
}
