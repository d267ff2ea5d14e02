//! Keyed SET/DEL event consumption.

use std::collections::{BTreeMap, VecDeque};

/// Operation type carried by a configuration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Set operation (add or update).
    Set,
    /// Delete operation.
    Del,
}

impl Operation {
    pub fn is_set(&self) -> bool {
        matches!(self, Operation::Set)
    }

    pub fn is_del(&self) -> bool {
        matches!(self, Operation::Del)
    }
}

/// A field-value pair from a configuration entry.
pub type FieldValue = (String, String);

/// Key, operation, and field-values tuple.
///
/// The fundamental unit of configuration consumed by an orchestration
/// module. Keys are table- or rule-scoped names (e.g. `"DATAACL"` or
/// `"DATAACL|RULE_1"`); field-values are empty for Del operations.
#[derive(Debug, Clone)]
pub struct KeyOpFieldsValues {
    pub key: String,
    pub op: Operation,
    pub fvs: Vec<FieldValue>,
}

impl KeyOpFieldsValues {
    pub fn new(key: impl Into<String>, op: Operation, fvs: Vec<FieldValue>) -> Self {
        Self {
            key: key.into(),
            op,
            fvs,
        }
    }

    /// Creates a Set entry.
    pub fn set(key: impl Into<String>, fvs: Vec<FieldValue>) -> Self {
        Self::new(key, Operation::Set, fvs)
    }

    /// Creates a Del entry.
    pub fn del(key: impl Into<String>) -> Self {
        Self::new(key, Operation::Del, vec![])
    }

    /// Returns the value for a field, if present.
    pub fn get_field(&self, field: &str) -> Option<&str> {
        self.fvs
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if this entry has the given field.
    pub fn has_field(&self, field: &str) -> bool {
        self.fvs.iter().any(|(f, _)| f == field)
    }
}

/// Configuration for a [`Consumer`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Table name this consumer watches (e.g. "ACL_TABLE").
    pub table_name: String,
    /// Priority (lower = drained first).
    pub priority: i32,
}

impl ConsumerConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Consumer for keyed configuration events.
///
/// Queues entries per key and deduplicates before the owning module drains
/// them:
///
/// - consecutive SETs for one key merge, newer field values overriding older
/// - a DEL discards any queued operations for its key
/// - DEL followed by SET keeps both, preserving order
pub struct Consumer {
    config: ConsumerConfig,
    to_sync: BTreeMap<String, VecDeque<KeyOpFieldsValues>>,
    pending: usize,
}

impl Consumer {
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            config,
            to_sync: BTreeMap::new(),
            pending: 0,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    pub fn priority(&self) -> i32 {
        self.config.priority
    }

    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Queues entries with deduplication.
    pub fn add_to_sync(&mut self, entries: Vec<KeyOpFieldsValues>) {
        for entry in entries {
            let queue = self.to_sync.entry(entry.key.clone()).or_default();
            match entry.op {
                Operation::Del => {
                    self.pending -= queue.len();
                    queue.clear();
                    queue.push_back(entry);
                    self.pending += 1;
                }
                Operation::Set => {
                    match queue.back_mut() {
                        Some(last) if last.op == Operation::Set => {
                            // Merge into the queued SET, newer values win.
                            for (field, value) in entry.fvs {
                                match last.fvs.iter_mut().find(|(f, _)| *f == field) {
                                    Some(existing) => existing.1 = value,
                                    None => last.fvs.push((field, value)),
                                }
                            }
                        }
                        _ => {
                            queue.push_back(entry);
                            self.pending += 1;
                        }
                    }
                }
            }
        }
    }

    /// Drains all pending entries, grouped by key in key order, preserving
    /// the operation order within each key.
    pub fn drain(&mut self) -> Vec<KeyOpFieldsValues> {
        let mut result = Vec::with_capacity(self.pending);
        for (_key, mut queue) in std::mem::take(&mut self.to_sync) {
            while let Some(entry) = queue.pop_front() {
                result.push(entry);
            }
        }
        self.pending = 0;
        result
    }

    /// Clears all pending entries.
    pub fn clear(&mut self) {
        self.to_sync.clear();
        self.pending = 0;
    }

    /// Dumps pending entries for debugging.
    pub fn dump(&self) -> Vec<String> {
        self.to_sync
            .iter()
            .flat_map(|(key, queue)| {
                queue.iter().map(move |e| {
                    let op = if e.op.is_set() { "SET" } else { "DEL" };
                    format!("{}: {} {:?}", key, op, e.fvs)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fv(field: &str, value: &str) -> FieldValue {
        (field.to_string(), value.to_string())
    }

    #[test]
    fn test_entry_accessors() {
        let entry = KeyOpFieldsValues::set("DATAACL|RULE_1", vec![fv("PRIORITY", "100")]);
        assert!(entry.op.is_set());
        assert_eq!(entry.get_field("PRIORITY"), Some("100"));
        assert!(!entry.has_field("PACKET_ACTION"));
    }

    #[test]
    fn test_set_merge() {
        let mut consumer = Consumer::new(ConsumerConfig::new("ACL_RULE"));

        consumer.add_to_sync(vec![KeyOpFieldsValues::set(
            "DATAACL|RULE_1",
            vec![fv("PRIORITY", "100")],
        )]);
        consumer.add_to_sync(vec![KeyOpFieldsValues::set(
            "DATAACL|RULE_1",
            vec![fv("PRIORITY", "200"), fv("PACKET_ACTION", "DROP")],
        )]);

        assert_eq!(consumer.pending_count(), 1);
        let entries = consumer.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].get_field("PRIORITY"), Some("200"));
        assert_eq!(entries[0].get_field("PACKET_ACTION"), Some("DROP"));
    }

    #[test]
    fn test_del_discards_queued_set() {
        let mut consumer = Consumer::new(ConsumerConfig::new("ACL_RULE"));

        consumer.add_to_sync(vec![
            KeyOpFieldsValues::set("DATAACL|RULE_1", vec![fv("PRIORITY", "100")]),
            KeyOpFieldsValues::del("DATAACL|RULE_1"),
        ]);

        let entries = consumer.drain();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].op.is_del());
        assert!(!consumer.has_pending());
    }

    #[test]
    fn test_del_then_set_keeps_both() {
        let mut consumer = Consumer::new(ConsumerConfig::new("ACL_TABLE"));

        consumer.add_to_sync(vec![
            KeyOpFieldsValues::del("DATAACL"),
            KeyOpFieldsValues::set("DATAACL", vec![fv("TYPE", "L3")]),
        ]);

        let entries = consumer.drain();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].op.is_del());
        assert!(entries[1].op.is_set());
    }

    #[test]
    fn test_drain_resets_pending() {
        let mut consumer = Consumer::new(ConsumerConfig::new("ACL_TABLE"));
        consumer.add_to_sync(vec![KeyOpFieldsValues::set("A", vec![]), KeyOpFieldsValues::set("B", vec![])]);
        assert_eq!(consumer.pending_count(), 2);
        assert_eq!(consumer.drain().len(), 2);
        assert!(!consumer.has_pending());
    }
}
