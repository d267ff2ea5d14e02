//! Configuration snapshot loading for simulation mode.
//!
//! The production transport delivers table and rule definitions as keyed
//! field-value events. In simulation mode the daemon loads a JSON snapshot
//! instead and converts it into the same event stream, so both paths
//! exercise identical handling.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use aclorch_common::KeyOpFieldsValues;

/// Error type for snapshot loading.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// A table definition in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub stage: Option<String>,
    pub ports: Vec<String>,
}

/// A rule definition in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub table: String,
    pub name: String,
    pub priority: u32,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub qualifiers: BTreeMap<String, String>,
}

/// A full configuration snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

impl Snapshot {
    /// Loads a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SnapshotError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Converts the table definitions into ACL_TABLE events.
    pub fn table_events(&self) -> Vec<KeyOpFieldsValues> {
        self.tables
            .iter()
            .map(|t| {
                let mut fvs = vec![
                    ("TYPE".to_string(), t.type_name.clone()),
                    ("PORTS".to_string(), t.ports.join(",")),
                ];
                if let Some(stage) = &t.stage {
                    fvs.push(("STAGE".to_string(), stage.clone()));
                }
                KeyOpFieldsValues::set(t.name.clone(), fvs)
            })
            .collect()
    }

    /// Converts the rule definitions into ACL_RULE events.
    pub fn rule_events(&self) -> Vec<KeyOpFieldsValues> {
        self.rules
            .iter()
            .map(|r| {
                let mut fvs = vec![("PRIORITY".to_string(), r.priority.to_string())];
                match (&r.redirect, &r.action) {
                    (Some(target), _) => {
                        fvs.push(("REDIRECT_ACTION".to_string(), target.clone()));
                    }
                    (None, Some(action)) => {
                        fvs.push(("PACKET_ACTION".to_string(), action.clone()));
                    }
                    (None, None) => {
                        fvs.push(("PACKET_ACTION".to_string(), "FORWARD".to_string()));
                    }
                }
                for (field, value) in &r.qualifiers {
                    fvs.push((field.clone(), value.clone()));
                }
                KeyOpFieldsValues::set(format!("{}|{}", r.table, r.name), fvs)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "tables": [
            {"name": "DATAACL", "type": "L3", "ports": ["Ethernet0", "Ethernet4"]}
        ],
        "rules": [
            {
                "table": "DATAACL",
                "name": "RULE_1",
                "priority": 100,
                "action": "DROP",
                "qualifiers": {"L4_SRC_PORT": "65000"}
            },
            {
                "table": "DATAACL",
                "name": "RULE_2",
                "priority": 90,
                "redirect": "10.0.0.2@Ethernet4"
            }
        ]
    }"#;

    #[test]
    fn test_load_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let snapshot = Snapshot::load(file.path()).unwrap();
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.rules.len(), 2);
        assert_eq!(snapshot.tables[0].type_name, "L3");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Snapshot::load(Path::new("/no/such/snapshot.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let err = Snapshot::load(file.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { .. }));
    }

    #[test]
    fn test_event_conversion() {
        let snapshot: Snapshot = serde_json::from_str(SAMPLE).unwrap();

        let tables = snapshot.table_events();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].key, "DATAACL");
        assert_eq!(tables[0].get_field("PORTS"), Some("Ethernet0,Ethernet4"));

        let rules = snapshot.rule_events();
        assert_eq!(rules[0].key, "DATAACL|RULE_1");
        assert_eq!(rules[0].get_field("PACKET_ACTION"), Some("DROP"));
        assert_eq!(rules[0].get_field("L4_SRC_PORT"), Some("65000"));
        assert_eq!(
            rules[1].get_field("REDIRECT_ACTION"),
            Some("10.0.0.2@Ethernet4")
        );
    }
}
