//! Per-(stage, bind-point-kind) binding counters.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::acl::{AclBindPointType, AclStage};

/// Used/available counts for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCounter {
    pub used: u32,
    pub available: u32,
}

impl ResourceCounter {
    fn new(available: u32) -> Self {
        Self { used: 0, available }
    }
}

const STAGES: [AclStage; 2] = [AclStage::Ingress, AclStage::Egress];
const BIND_POINTS: [AclBindPointType; 2] = [AclBindPointType::Port, AclBindPointType::Lag];

/// ACL table-binding counters keyed by (stage, bind-point kind).
///
/// Increment/decrement are paired with the binding operation they account
/// for; a decrement below zero indicates unbalanced accounting and is logged
/// rather than wrapped.
#[derive(Debug)]
pub struct AclResourceCounters {
    counters: Mutex<HashMap<(AclStage, AclBindPointType), ResourceCounter>>,
}

impl AclResourceCounters {
    /// Creates counters with the same capacity for every key.
    pub fn with_capacity(available: u32) -> Self {
        let mut counters = HashMap::new();
        for stage in STAGES {
            for bp in BIND_POINTS {
                counters.insert((stage, bp), ResourceCounter::new(available));
            }
        }
        Self {
            counters: Mutex::new(counters),
        }
    }

    /// Accounts one new binding.
    pub fn increment(&self, stage: AclStage, bind_point: AclBindPointType) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(counter) = counters.get_mut(&(stage, bind_point)) {
            counter.used += 1;
            counter.available = counter.available.saturating_sub(1);
        }
    }

    /// Accounts one released binding.
    pub fn decrement(&self, stage: AclStage, bind_point: AclBindPointType) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(counter) = counters.get_mut(&(stage, bind_point)) {
            if counter.used == 0 {
                log::error!(
                    "acl binding counter underflow at {}:{}",
                    stage,
                    bind_point
                );
                return;
            }
            counter.used -= 1;
            counter.available += 1;
        }
    }

    /// Returns the used count for a key.
    pub fn used(&self, stage: AclStage, bind_point: AclBindPointType) -> u32 {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(stage, bind_point))
            .map(|c| c.used)
            .unwrap_or(0)
    }

    /// Returns the available count for a key.
    pub fn available(&self, stage: AclStage, bind_point: AclBindPointType) -> u32 {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(stage, bind_point))
            .map(|c| c.available)
            .unwrap_or(0)
    }

    /// Snapshot of all counters, for telemetry export.
    pub fn snapshot(&self) -> Vec<((AclStage, AclBindPointType), ResourceCounter)> {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = counters.iter().map(|(k, v)| (*k, *v)).collect();
        out.sort_by_key(|((stage, bp), _)| (format!("{}", stage), format!("{}", bp)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_increment_decrement_symmetry() {
        let counters = AclResourceCounters::with_capacity(8);
        assert_eq!(counters.used(AclStage::Ingress, AclBindPointType::Port), 0);

        counters.increment(AclStage::Ingress, AclBindPointType::Port);
        counters.increment(AclStage::Ingress, AclBindPointType::Port);
        assert_eq!(counters.used(AclStage::Ingress, AclBindPointType::Port), 2);
        assert_eq!(
            counters.available(AclStage::Ingress, AclBindPointType::Port),
            6
        );

        counters.decrement(AclStage::Ingress, AclBindPointType::Port);
        counters.decrement(AclStage::Ingress, AclBindPointType::Port);
        assert_eq!(counters.used(AclStage::Ingress, AclBindPointType::Port), 0);
        assert_eq!(
            counters.available(AclStage::Ingress, AclBindPointType::Port),
            8
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let counters = AclResourceCounters::with_capacity(8);
        counters.increment(AclStage::Ingress, AclBindPointType::Lag);

        assert_eq!(counters.used(AclStage::Ingress, AclBindPointType::Lag), 1);
        assert_eq!(counters.used(AclStage::Ingress, AclBindPointType::Port), 0);
        assert_eq!(counters.used(AclStage::Egress, AclBindPointType::Lag), 0);
    }

    #[test]
    fn test_underflow_is_clamped() {
        let counters = AclResourceCounters::with_capacity(8);
        counters.decrement(AclStage::Egress, AclBindPointType::Port);
        assert_eq!(counters.used(AclStage::Egress, AclBindPointType::Port), 0);
        assert_eq!(
            counters.available(AclStage::Egress, AclBindPointType::Port),
            8
        );
    }

    #[test]
    fn test_snapshot_covers_all_keys() {
        let counters = AclResourceCounters::with_capacity(4);
        assert_eq!(counters.snapshot().len(), 4);
    }
}
