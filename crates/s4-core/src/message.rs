//! Cross-context messages.
//!
//! The background coordinator announces finished work to every open UI
//! context with these. Serialized as `{"type": "sync-complete", "synced": n}`.

use serde::{Deserialize, Serialize};

/// Message broadcast from the background coordinator to UI contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContextMessage {
    /// The coordinator delivered `synced` queued anchors.
    SyncComplete {
        /// Items delivered during the wake
        synced: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_complete_wire_shape() {
        let json = serde_json::to_value(ContextMessage::SyncComplete { synced: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "sync-complete", "synced": 3 }));
    }

    #[test]
    fn parses_from_wire() {
        let msg: ContextMessage =
            serde_json::from_str(r#"{"type":"sync-complete","synced":1}"#).unwrap();
        assert_eq!(msg, ContextMessage::SyncComplete { synced: 1 });
    }
}
