use serde_json::Value;
use tracing::{debug, warn};

use super::{SaveOutcome, StorageHandle, write_with_eviction};
use crate::common::collections::BTreeMap;
use crate::model::NodeConfig;

pub const NODE_LAYOUTS_KEY: &str = "node-layouts";

/// The `node-layouts` document: every node's config keyed by node id.
#[derive(Debug, Clone)]
pub struct NodeLayoutStore {
    storage: StorageHandle,
    retention_steps: Vec<usize>,
}

impl NodeLayoutStore {
    pub fn new(storage: StorageHandle, retention_steps: Vec<usize>) -> Self {
        Self { storage, retention_steps }
    }

    pub fn storage(&self) -> &StorageHandle { &self.storage }

    /// Never fails: a missing or unreadable document is an empty mapping and
    /// entries that do not parse are skipped.
    pub fn load(&self) -> BTreeMap<String, NodeConfig> {
        let mut configs = BTreeMap::new();
        let Some(blob) = self.storage.read(NODE_LAYOUTS_KEY) else {
            return configs;
        };
        let entries = match serde_json::from_str::<Value>(&blob) {
            Ok(Value::Object(entries)) => entries,
            Ok(_) => {
                warn!("stored node layouts are not a JSON object; ignoring them");
                return configs;
            }
            Err(err) => {
                warn!(error = %err, "stored node layouts are not valid JSON; ignoring them");
                return configs;
            }
        };

        for (node_id, value) in entries {
            match serde_json::from_value::<NodeConfig>(value) {
                Ok(config) => {
                    configs.insert(node_id, config);
                }
                Err(err) => warn!(node = %node_id, error = %err, "skipping malformed node layout"),
            }
        }
        debug!(count = configs.len(), "loaded node layouts");
        configs
    }

    /// Writes the whole mapping. Over quota, the oldest nodes by creation
    /// time are left out of the persisted copy.
    pub fn save(&self, configs: &BTreeMap<String, NodeConfig>) -> SaveOutcome {
        let mut entries: Vec<(&String, &NodeConfig)> = configs.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| (a.created_at(), a_id).cmp(&(b.created_at(), b_id)));
        write_with_eviction(
            &self.storage,
            NODE_LAYOUTS_KEY,
            &entries,
            &self.retention_steps,
            |kept| serde_json::to_string(&kept.iter().copied().collect::<BTreeMap<_, _>>()),
        )
    }
}
