//! Device capability gating.
//!
//! The forwarding plane reports, per stage, which action and qualifier
//! kinds it can program. The sets are queried once at startup and again
//! after a device re-initialization; a refresh replaces the whole state
//! atomically, never merges. Rules validated before a refresh are not
//! retroactively revoked; rules submitted after it are judged against the
//! refreshed sets.

use std::collections::HashSet;

use super::types::{AclActionType, AclMatchField, AclStage, RuleRejection};

/// Supported action and qualifier kinds for one stage.
#[derive(Debug, Clone)]
pub struct AclStageCapabilities {
    pub supported_actions: HashSet<AclActionType>,
    pub supported_matches: HashSet<AclMatchField>,
}

impl AclStageCapabilities {
    /// The full device profile: every action and qualifier kind supported.
    pub fn full() -> Self {
        Self {
            supported_actions: [
                AclActionType::PacketAction,
                AclActionType::Redirect,
                AclActionType::Counter,
            ]
            .into(),
            supported_matches: [
                AclMatchField::SrcIp,
                AclMatchField::DstIp,
                AclMatchField::IpProtocol,
                AclMatchField::IcmpType,
                AclMatchField::IcmpCode,
                AclMatchField::SrcIpv6,
                AclMatchField::DstIpv6,
                AclMatchField::Ipv6NextHeader,
                AclMatchField::Icmpv6Type,
                AclMatchField::Icmpv6Code,
                AclMatchField::L4SrcPort,
                AclMatchField::L4DstPort,
                AclMatchField::L4SrcPortRange,
                AclMatchField::L4DstPortRange,
                AclMatchField::TcpFlags,
                AclMatchField::EtherType,
                AclMatchField::OuterVlanId,
                AclMatchField::AclIpType,
                AclMatchField::InPorts,
                AclMatchField::OutPorts,
            ]
            .into(),
        }
    }

    /// A restricted profile supporting only the given actions (full
    /// qualifier set).
    pub fn with_actions(actions: impl IntoIterator<Item = AclActionType>) -> Self {
        Self {
            supported_actions: actions.into_iter().collect(),
            ..Self::full()
        }
    }

    pub fn supports_action(&self, action: AclActionType) -> bool {
        self.supported_actions.contains(&action)
    }

    pub fn supports_match(&self, field: AclMatchField) -> bool {
        self.supported_matches.contains(&field)
    }
}

/// Process-wide device capability state, per stage.
#[derive(Debug, Clone)]
pub struct AclCapabilities {
    ingress: AclStageCapabilities,
    egress: AclStageCapabilities,
}

impl AclCapabilities {
    pub fn new(ingress: AclStageCapabilities, egress: AclStageCapabilities) -> Self {
        Self { ingress, egress }
    }

    /// The default device profile: everything supported at both stages.
    pub fn full_profile() -> Self {
        Self::new(AclStageCapabilities::full(), AclStageCapabilities::full())
    }

    /// Capabilities for one stage.
    pub fn stage(&self, stage: AclStage) -> &AclStageCapabilities {
        match stage {
            AclStage::Ingress => &self.ingress,
            AclStage::Egress => &self.egress,
        }
    }

    /// Checks an action against the stage's supported set.
    pub fn validate_action(
        &self,
        stage: AclStage,
        action: AclActionType,
    ) -> Result<(), RuleRejection> {
        if self.stage(stage).supports_action(action) {
            Ok(())
        } else {
            Err(RuleRejection::UnsupportedAction(action))
        }
    }

    /// Supported action kinds for a stage, sorted for stable export.
    pub fn supported_actions(&self, stage: AclStage) -> Vec<AclActionType> {
        let mut actions: Vec<_> = self.stage(stage).supported_actions.iter().copied().collect();
        actions.sort_by_key(|a| a.to_string());
        actions
    }
}

impl Default for AclCapabilities {
    fn default() -> Self {
        Self::full_profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_profile_supports_everything() {
        let caps = AclCapabilities::full_profile();
        for stage in [AclStage::Ingress, AclStage::Egress] {
            assert!(caps.validate_action(stage, AclActionType::PacketAction).is_ok());
            assert!(caps.validate_action(stage, AclActionType::Redirect).is_ok());
        }
    }

    #[test]
    fn test_restricted_stage() {
        let caps = AclCapabilities::new(
            AclStageCapabilities::with_actions([AclActionType::Redirect]),
            AclStageCapabilities::full(),
        );

        assert_eq!(
            caps.validate_action(AclStage::Ingress, AclActionType::PacketAction),
            Err(RuleRejection::UnsupportedAction(AclActionType::PacketAction))
        );
        assert!(caps
            .validate_action(AclStage::Ingress, AclActionType::Redirect)
            .is_ok());
        // The other stage is unaffected.
        assert!(caps
            .validate_action(AclStage::Egress, AclActionType::PacketAction)
            .is_ok());
    }

    #[test]
    fn test_supported_actions_export() {
        let caps = AclCapabilities::full_profile();
        let actions = caps.supported_actions(AclStage::Ingress);
        assert_eq!(actions.len(), 3);
    }
}
