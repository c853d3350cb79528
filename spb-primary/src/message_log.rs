use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::message::{Message, MessageKind};

/// A record of one processed message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub group_id: String,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub metric_amount: usize,
    pub received_at: DateTime<Utc>,
}

impl From<&Message> for LogEntry {
    fn from(message: &Message) -> Self {
        Self {
            group_id: message.group_id.clone(),
            node_id: message.node_id.clone(),
            device_id: message.device_id.clone(),
            kind: message.kind.clone(),
            metric_amount: message.metrics.len(),
            received_at: message.received_at,
        }
    }
}

/// Append-only in-memory message history
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: &Message) {
        self.entries.write().push(message.into());
    }

    /// All entries in the order they were processed
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
