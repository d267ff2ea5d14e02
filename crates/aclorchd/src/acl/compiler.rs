//! Qualifier compilation.
//!
//! Deterministic, stateless translation from configuration qualifiers to
//! compiled match fields. Each input qualifier compiles to one
//! `(field, value, mask)` triple, a resolved port set, or a shared range
//! reference; masks default to the field's full width unless the input
//! carries an explicit `value/mask` pair.
//!
//! Two behaviors here are contractual and easy to get wrong:
//!
//! - **Protocol/next-header duality.** `IP_PROTOCOL` compiles to the IPv4
//!   protocol field on a vanilla table and, for backward compatibility, to
//!   the IPv6 next-header field on a v6 table. `NEXT_HEADER` is only legal
//!   on v6 tables.
//! - **TCP-flags implication.** A rule matching TCP flags without an
//!   explicit protocol qualifier gets protocol-equals-6 appended, on
//!   whichever protocol field the table family uses. An explicit protocol
//!   value always stands, even if inconsistent with the flags.

use std::collections::BTreeMap;

use aclorch_sai::api::acl::format_oid_list;
use aclorch_sai::RawSaiObjectId;
use aclorch_types::{IpAddress, IpPrefix, Ipv4Address, Ipv6Address, VlanId};

use crate::ports::PortRegistry;

use super::range::{AclRangeProperties, AclRangeType};
use super::table_type::AclTableType;
use super::types::{AclIpTypeValue, AclMatchField, RuleRejection};

/// IP protocol number synthesized for TCP-flags matches.
const TCP_PROTOCOL: u8 = 6;

/// Compiled value of one match field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclFieldValue {
    U8 { value: u8, mask: u8 },
    U16 { value: u16, mask: u16 },
    Ipv4 { value: Ipv4Address, mask: Ipv4Address },
    Ipv6 { value: Ipv6Address, mask: Ipv6Address },
    IpType(AclIpTypeValue),
    PortList(Vec<RawSaiObjectId>),
    Range(AclRangeProperties),
}

impl AclFieldValue {
    /// Serializes to the ASIC wire form.
    pub fn serialize(&self) -> String {
        match self {
            Self::U8 { value, mask } => format!("{}&mask:0x{:x}", value, mask),
            Self::U16 { value, mask } => format!("{}&mask:0x{:x}", value, mask),
            Self::Ipv4 { value, mask } => format!("{}&mask:{}", value, mask),
            Self::Ipv6 { value, mask } => format!("{}&mask:{}", value, mask),
            Self::IpType(t) => format!("{}&mask:0xffffffffffffffff", t.sai_value()),
            Self::PortList(oids) => format_oid_list(oids),
            Self::Range(props) => props.to_string(),
        }
    }
}

/// One compiled match field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQualifier {
    pub field: AclMatchField,
    pub value: AclFieldValue,
}

impl CompiledQualifier {
    /// Serialized SAI entry attribute carrying this field.
    ///
    /// `None` for range references: those program through shared range
    /// objects whose ids are only known at apply time.
    pub fn sai_attr(&self) -> Option<(String, String)> {
        match &self.value {
            AclFieldValue::Range(_) => None,
            value => Some((self.field.sai_entry_attr(), value.serialize())),
        }
    }

    /// Range properties, if this field is a range reference.
    pub fn range_properties(&self) -> Option<&AclRangeProperties> {
        match &self.value {
            AclFieldValue::Range(props) => Some(props),
            _ => None,
        }
    }
}

/// Output of compiling a rule's full qualifier set.
#[derive(Debug, Clone, Default)]
pub struct CompiledMatches {
    /// Compiled fields in deterministic order (input field order, implied
    /// protocol appended last).
    pub fields: Vec<CompiledQualifier>,
    /// Interface names dropped from port-list qualifiers; the caller logs
    /// them, the rule proceeds with the resolved subset.
    pub dropped_ports: Vec<String>,
}

impl CompiledMatches {
    /// All range references in the compiled set.
    pub fn range_properties(&self) -> Vec<AclRangeProperties> {
        self.fields
            .iter()
            .filter_map(|q| q.range_properties().cloned())
            .collect()
    }
}

/// Compiles configuration qualifiers for one table.
///
/// Borrows the table type for field legality and family aliasing, and the
/// port registry for port-list resolution. Holds no state of its own.
pub struct QualifierCompiler<'a> {
    table_type: &'a AclTableType,
    ports: &'a PortRegistry,
}

impl<'a> QualifierCompiler<'a> {
    pub fn new(table_type: &'a AclTableType, ports: &'a PortRegistry) -> Self {
        Self { table_type, ports }
    }

    /// Compiles a rule's full qualifier set.
    ///
    /// Fails with the first rejection: an illegal qualifier for the table
    /// type, an unparsable value, or a port list with nothing resolvable.
    pub fn compile_all(
        &self,
        qualifiers: &BTreeMap<AclMatchField, String>,
    ) -> Result<CompiledMatches, RuleRejection> {
        let mut out = CompiledMatches::default();

        for (&input_field, raw) in qualifiers {
            let field = self.resolve_field(input_field)?;
            if !self.table_type.supports_match(field) {
                return Err(RuleRejection::DisallowedQualifier(input_field));
            }

            if field.is_port_list() {
                let resolution = self.ports.resolve_list(raw);
                if resolution.is_empty() {
                    return Err(RuleRejection::EmptyPortList(field));
                }
                out.dropped_ports.extend(resolution.unresolved.iter().cloned());
                out.fields.push(CompiledQualifier {
                    field,
                    value: AclFieldValue::PortList(resolution.raw_ids()),
                });
            } else {
                out.fields.push(self.compile_value(field, raw)?);
            }
        }

        if self.needs_implied_tcp_protocol(qualifiers) {
            out.fields.push(self.implied_tcp_protocol());
        }

        Ok(out)
    }

    /// Maps an input qualifier to the field the table family programs.
    fn resolve_field(&self, field: AclMatchField) -> Result<AclMatchField, RuleRejection> {
        match field {
            // Backward compatibility: IP_PROTOCOL on a v6 table matches the
            // next header.
            AclMatchField::IpProtocol if self.table_type.is_v6() => {
                Ok(AclMatchField::Ipv6NextHeader)
            }
            AclMatchField::Ipv6NextHeader if !self.table_type.is_v6() => {
                Err(RuleRejection::DisallowedQualifier(field))
            }
            other => Ok(other),
        }
    }

    fn needs_implied_tcp_protocol(
        &self,
        qualifiers: &BTreeMap<AclMatchField, String>,
    ) -> bool {
        qualifiers.contains_key(&AclMatchField::TcpFlags)
            && !qualifiers.contains_key(&AclMatchField::IpProtocol)
            && !qualifiers.contains_key(&AclMatchField::Ipv6NextHeader)
    }

    fn implied_tcp_protocol(&self) -> CompiledQualifier {
        let field = if self.table_type.is_v6() {
            AclMatchField::Ipv6NextHeader
        } else {
            AclMatchField::IpProtocol
        };
        CompiledQualifier {
            field,
            value: AclFieldValue::U8 {
                value: TCP_PROTOCOL,
                mask: 0xff,
            },
        }
    }

    fn compile_value(
        &self,
        field: AclMatchField,
        raw: &str,
    ) -> Result<CompiledQualifier, RuleRejection> {
        let invalid = |message: &str| RuleRejection::InvalidValue {
            field,
            value: raw.to_string(),
            message: message.to_string(),
        };

        let value = match field {
            AclMatchField::IpProtocol
            | AclMatchField::Ipv6NextHeader
            | AclMatchField::IcmpType
            | AclMatchField::IcmpCode
            | AclMatchField::Icmpv6Type
            | AclMatchField::Icmpv6Code
            | AclMatchField::TcpFlags => {
                let (v, m) = split_mask(raw);
                AclFieldValue::U8 {
                    value: parse_u8(v).ok_or_else(|| invalid("expected an 8-bit value"))?,
                    mask: match m {
                        Some(m) => parse_u8(m).ok_or_else(|| invalid("expected an 8-bit mask"))?,
                        None => 0xff,
                    },
                }
            }

            AclMatchField::L4SrcPort | AclMatchField::L4DstPort | AclMatchField::EtherType => {
                let (v, m) = split_mask(raw);
                AclFieldValue::U16 {
                    value: parse_u16(v).ok_or_else(|| invalid("expected a 16-bit value"))?,
                    mask: match m {
                        Some(m) => parse_u16(m).ok_or_else(|| invalid("expected a 16-bit mask"))?,
                        None => 0xffff,
                    },
                }
            }

            AclMatchField::OuterVlanId => {
                let (v, m) = split_mask(raw);
                let vid: VlanId = v.trim().parse().map_err(|_| invalid("expected a VLAN id"))?;
                AclFieldValue::U16 {
                    value: vid.value(),
                    mask: match m {
                        Some(m) => parse_u16(m).ok_or_else(|| invalid("expected a 16-bit mask"))?,
                        None => 0xfff,
                    },
                }
            }

            AclMatchField::SrcIp | AclMatchField::DstIp => {
                let prefix: IpPrefix = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid("expected an IPv4 prefix"))?;
                match (prefix.network(), prefix.mask()) {
                    (IpAddress::V4(value), IpAddress::V4(mask)) => {
                        AclFieldValue::Ipv4 { value, mask }
                    }
                    _ => return Err(invalid("expected an IPv4 prefix")),
                }
            }

            AclMatchField::SrcIpv6 | AclMatchField::DstIpv6 => {
                let prefix: IpPrefix = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid("expected an IPv6 prefix"))?;
                match (prefix.network(), prefix.mask()) {
                    (IpAddress::V6(value), IpAddress::V6(mask)) => {
                        AclFieldValue::Ipv6 { value, mask }
                    }
                    _ => return Err(invalid("expected an IPv6 prefix")),
                }
            }

            AclMatchField::AclIpType => AclFieldValue::IpType(
                raw.trim()
                    .parse()
                    .map_err(|_| invalid("unknown IP type"))?,
            ),

            AclMatchField::L4SrcPortRange | AclMatchField::L4DstPortRange => {
                let (min, max) = raw
                    .split_once('-')
                    .ok_or_else(|| invalid("expected min-max"))?;
                let min = parse_u16(min).ok_or_else(|| invalid("expected a 16-bit minimum"))?;
                let max = parse_u16(max).ok_or_else(|| invalid("expected a 16-bit maximum"))?;
                if min > max {
                    return Err(invalid("range minimum exceeds maximum"));
                }
                let range_type = if field == AclMatchField::L4SrcPortRange {
                    AclRangeType::L4SrcPort
                } else {
                    AclRangeType::L4DstPort
                };
                AclFieldValue::Range(AclRangeProperties::new(range_type, min, max))
            }

            AclMatchField::InPorts | AclMatchField::OutPorts => {
                return Err(invalid("port lists resolve through the port registry"))
            }
        };

        Ok(CompiledQualifier { field, value })
    }
}

fn split_mask(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('/') {
        Some((v, m)) => (v, Some(m)),
        None => (raw, None),
    }
}

fn parse_u8(s: &str) -> Option<u8> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_u16(s: &str) -> Option<u16> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}
