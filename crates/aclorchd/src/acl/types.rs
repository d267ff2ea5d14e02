//! ACL vocabulary: stages, bind points, match fields, actions.
//!
//! The qualifier vocabulary is a closed set. Every configuration qualifier
//! name parses into exactly one [`AclMatchField`] tag, and each tag has one
//! compilation rule, dispatched through an exhaustive match in the compiler.
//! Adding a qualifier is a compile-time-checked extension, not a runtime
//! lookup-table edit.

use std::fmt;
use std::str::FromStr;

/// ACL stage (ingress or egress).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AclStage {
    /// Ingress ACL (applied to incoming packets).
    #[default]
    Ingress,
    /// Egress ACL (applied to outgoing packets).
    Egress,
}

impl AclStage {
    /// Returns the SAI stage identifier.
    pub fn sai_value(&self) -> &'static str {
        match self {
            Self::Ingress => "SAI_ACL_STAGE_INGRESS",
            Self::Egress => "SAI_ACL_STAGE_EGRESS",
        }
    }
}

impl fmt::Display for AclStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => write!(f, "INGRESS"),
            Self::Egress => write!(f, "EGRESS"),
        }
    }
}

impl FromStr for AclStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INGRESS" => Ok(Self::Ingress),
            "EGRESS" => Ok(Self::Egress),
            _ => Err(format!("Unknown ACL stage: {}", s)),
        }
    }
}

/// Bind point kind an ACL table attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AclBindPointType {
    /// Physical port.
    Port,
    /// Link aggregation group.
    Lag,
}

impl AclBindPointType {
    /// Returns the SAI bind point identifier.
    pub fn sai_value(&self) -> &'static str {
        match self {
            Self::Port => "SAI_ACL_BIND_POINT_TYPE_PORT",
            Self::Lag => "SAI_ACL_BIND_POINT_TYPE_LAG",
        }
    }
}

impl fmt::Display for AclBindPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port => write!(f, "PORT"),
            Self::Lag => write!(f, "LAG"),
        }
    }
}

impl FromStr for AclBindPointType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PORT" => Ok(Self::Port),
            "LAG" => Ok(Self::Lag),
            _ => Err(format!("Unknown ACL bind point type: {}", s)),
        }
    }
}

/// ACL match fields.
///
/// `Display` renders the forwarding-plane field identifier; `FromStr`
/// accepts the configuration qualifier vocabulary, including the historical
/// aliases (`NEXT_HEADER`, `VLAN_ID`, `IP_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AclMatchField {
    // IPv4 fields
    SrcIp,
    DstIp,
    IpProtocol,
    IcmpType,
    IcmpCode,

    // IPv6 fields
    SrcIpv6,
    DstIpv6,
    Ipv6NextHeader,
    Icmpv6Type,
    Icmpv6Code,

    // L4 fields
    L4SrcPort,
    L4DstPort,
    L4SrcPortRange,
    L4DstPortRange,
    TcpFlags,

    // L2 fields
    EtherType,
    OuterVlanId,

    // Classification fields
    AclIpType,

    // Port-set fields
    InPorts,
    OutPorts,
}

impl AclMatchField {
    /// Returns the SAI entry attribute id carrying this field.
    pub fn sai_entry_attr(&self) -> String {
        match self {
            Self::L4SrcPortRange | Self::L4DstPortRange => {
                "SAI_ACL_ENTRY_ATTR_FIELD_ACL_RANGE_TYPE".to_string()
            }
            other => format!("SAI_ACL_ENTRY_ATTR_FIELD_{}", other),
        }
    }

    /// Returns the SAI table attribute id enabling this field.
    pub fn sai_table_attr(&self) -> String {
        match self {
            Self::L4SrcPortRange | Self::L4DstPortRange => {
                "SAI_ACL_TABLE_ATTR_FIELD_ACL_RANGE_TYPE".to_string()
            }
            other => format!("SAI_ACL_TABLE_ATTR_FIELD_{}", other),
        }
    }

    /// Returns true for fields resolved through the port registry.
    pub fn is_port_list(&self) -> bool {
        matches!(self, Self::InPorts | Self::OutPorts)
    }

    /// Returns true for fields compiled to shared range objects.
    pub fn is_range(&self) -> bool {
        matches!(self, Self::L4SrcPortRange | Self::L4DstPortRange)
    }
}

impl fmt::Display for AclMatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SrcIp => "SRC_IP",
            Self::DstIp => "DST_IP",
            Self::IpProtocol => "IP_PROTOCOL",
            Self::IcmpType => "ICMP_TYPE",
            Self::IcmpCode => "ICMP_CODE",
            Self::SrcIpv6 => "SRC_IPV6",
            Self::DstIpv6 => "DST_IPV6",
            Self::Ipv6NextHeader => "IPV6_NEXT_HEADER",
            Self::Icmpv6Type => "ICMPV6_TYPE",
            Self::Icmpv6Code => "ICMPV6_CODE",
            Self::L4SrcPort => "L4_SRC_PORT",
            Self::L4DstPort => "L4_DST_PORT",
            Self::L4SrcPortRange => "L4_SRC_PORT_RANGE",
            Self::L4DstPortRange => "L4_DST_PORT_RANGE",
            Self::TcpFlags => "TCP_FLAGS",
            Self::EtherType => "ETHER_TYPE",
            Self::OuterVlanId => "OUTER_VLAN_ID",
            Self::AclIpType => "ACL_IP_TYPE",
            Self::InPorts => "IN_PORTS",
            Self::OutPorts => "OUT_PORTS",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AclMatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SRC_IP" => Ok(Self::SrcIp),
            "DST_IP" => Ok(Self::DstIp),
            "IP_PROTOCOL" => Ok(Self::IpProtocol),
            "ICMP_TYPE" => Ok(Self::IcmpType),
            "ICMP_CODE" => Ok(Self::IcmpCode),
            "SRC_IPV6" => Ok(Self::SrcIpv6),
            "DST_IPV6" => Ok(Self::DstIpv6),
            "IPV6_NEXT_HEADER" | "NEXT_HEADER" => Ok(Self::Ipv6NextHeader),
            "ICMPV6_TYPE" => Ok(Self::Icmpv6Type),
            "ICMPV6_CODE" => Ok(Self::Icmpv6Code),
            "L4_SRC_PORT" => Ok(Self::L4SrcPort),
            "L4_DST_PORT" => Ok(Self::L4DstPort),
            "L4_SRC_PORT_RANGE" => Ok(Self::L4SrcPortRange),
            "L4_DST_PORT_RANGE" => Ok(Self::L4DstPortRange),
            "TCP_FLAGS" => Ok(Self::TcpFlags),
            "ETHER_TYPE" => Ok(Self::EtherType),
            "VLAN_ID" | "OUTER_VLAN_ID" => Ok(Self::OuterVlanId),
            "IP_TYPE" | "ACL_IP_TYPE" => Ok(Self::AclIpType),
            "IN_PORTS" => Ok(Self::InPorts),
            "OUT_PORTS" => Ok(Self::OutPorts),
            _ => Err(format!("Unknown ACL match field: {}", s)),
        }
    }
}

/// Values of the ACL-IP-type classification field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclIpTypeValue {
    Any,
    Ip,
    NonIp,
    Ipv4Any,
    NonIpv4,
    Ipv6Any,
    NonIpv6,
}

impl AclIpTypeValue {
    /// Returns the SAI enumeration value identifier.
    pub fn sai_value(&self) -> &'static str {
        match self {
            Self::Any => "SAI_ACL_IP_TYPE_ANY",
            Self::Ip => "SAI_ACL_IP_TYPE_IP",
            Self::NonIp => "SAI_ACL_IP_TYPE_NON_IP",
            Self::Ipv4Any => "SAI_ACL_IP_TYPE_IPV4ANY",
            Self::NonIpv4 => "SAI_ACL_IP_TYPE_NON_IPV4",
            Self::Ipv6Any => "SAI_ACL_IP_TYPE_IPV6ANY",
            Self::NonIpv6 => "SAI_ACL_IP_TYPE_NON_IPV6",
        }
    }
}

impl fmt::Display for AclIpTypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Any => "ANY",
            Self::Ip => "IP",
            Self::NonIp => "NON_IP",
            Self::Ipv4Any => "IPV4ANY",
            Self::NonIpv4 => "NON_IPV4",
            Self::Ipv6Any => "IPV6ANY",
            Self::NonIpv6 => "NON_IPV6",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AclIpTypeValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ANY" => Ok(Self::Any),
            "IP" => Ok(Self::Ip),
            "NON_IP" | "NONIP" => Ok(Self::NonIp),
            "IPV4" | "IPV4ANY" => Ok(Self::Ipv4Any),
            "NON_IPV4" | "NONIPV4" => Ok(Self::NonIpv4),
            "IPV6" | "IPV6ANY" => Ok(Self::Ipv6Any),
            "NON_IPV6" | "NONIPV6" => Ok(Self::NonIpv6),
            _ => Err(format!("Unknown ACL IP type: {}", s)),
        }
    }
}

/// ACL action kinds, the unit of capability gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclActionType {
    /// Packet action (forward, drop).
    PacketAction,
    /// Redirect to a next-hop or port.
    Redirect,
    /// Attach a counter.
    Counter,
}

impl fmt::Display for AclActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketAction => write!(f, "PACKET_ACTION"),
            Self::Redirect => write!(f, "REDIRECT_ACTION"),
            Self::Counter => write!(f, "COUNTER"),
        }
    }
}

impl FromStr for AclActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PACKET_ACTION" => Ok(Self::PacketAction),
            "REDIRECT_ACTION" => Ok(Self::Redirect),
            "COUNTER" => Ok(Self::Counter),
            _ => Err(format!("Unknown ACL action type: {}", s)),
        }
    }
}

/// ACL packet action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AclPacketAction {
    /// Forward the packet.
    #[default]
    Forward,
    /// Drop the packet.
    Drop,
}

impl AclPacketAction {
    /// Returns the SAI packet action identifier.
    pub fn sai_value(&self) -> &'static str {
        match self {
            Self::Forward => "SAI_PACKET_ACTION_FORWARD",
            Self::Drop => "SAI_PACKET_ACTION_DROP",
        }
    }
}

impl fmt::Display for AclPacketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "FORWARD"),
            Self::Drop => write!(f, "DROP"),
        }
    }
}

impl FromStr for AclPacketAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FORWARD" => Ok(Self::Forward),
            "DROP" => Ok(Self::Drop),
            _ => Err(format!("Unknown packet action: {}", s)),
        }
    }
}

/// ACL table identifier (name, unique switch-wide).
pub type AclTableId = String;

/// ACL rule identifier (name, unique within a table).
pub type AclRuleId = String;

/// ACL priority (higher = evaluated first).
pub type AclPriority = u32;

/// Pre-defined ACL table type names.
pub mod table_type_names {
    pub const L3: &str = "L3";
    pub const L3V6: &str = "L3V6";
}

/// Reasons a rule is rejected.
///
/// These are local decisions, not errors raised to the configuration
/// source: a rejected rule is logged and never reaches the forwarding
/// plane, and no partial object is left behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleRejection {
    /// Qualifier is not legal for the table's type/stage.
    #[error("qualifier {0} is not allowed on this table type")]
    DisallowedQualifier(AclMatchField),

    /// Qualifier value failed to parse or is out of range.
    #[error("invalid value '{value}' for qualifier {field}: {message}")]
    InvalidValue {
        field: AclMatchField,
        value: String,
        message: String,
    },

    /// Every name in a port-list qualifier was unresolvable.
    #[error("no name in the {0} list resolved to a known interface")]
    EmptyPortList(AclMatchField),

    /// Action kind absent from the stage's capability set.
    #[error("action {0} is not supported at this stage")]
    UnsupportedAction(AclActionType),

    /// Redirect target could not be resolved.
    #[error("redirect target '{0}' could not be resolved")]
    UnresolvedTarget(String),
}
