use std::{collections::BTreeMap, sync::Arc};

use log::{debug, warn};
use parking_lot::RwLock;

use crate::{
    error::ProcessError,
    event::Event,
    group::{Group, GroupView},
    message::{Message, MessageKind},
    message_log::{LogEntry, MessageLog},
    metric::Warnings,
};

/// Options for a [Store]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Keep a record of every processed message
    pub record_messages: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            record_messages: true,
        }
    }
}

/// Root of the group → node → device tree.
///
/// All mutation goes through [Store::process], which is expected to be called from a single
/// writer. Fetches may happen concurrently from any thread.
pub struct Store {
    groups: RwLock<BTreeMap<String, Arc<Group>>>,
    warnings: Arc<Warnings>,
    log: Option<MessageLog>,
}

impl Store {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            groups: RwLock::new(BTreeMap::new()),
            warnings: Arc::new(Warnings::default()),
            log: options.record_messages.then(MessageLog::new),
        }
    }

    fn group(&self, kind: &'static str, message: &Message) -> Result<Arc<Group>, ProcessError> {
        match self.groups.read().get(&message.group_id) {
            Some(group) => Ok(group.clone()),
            None => {
                debug!("{kind}: group {} is not in the store", message.group_id);
                Err(ProcessError::RoutingMiss {
                    kind,
                    path: message.group_id.clone(),
                })
            }
        }
    }

    fn device_id<'a>(kind: &'static str, message: &'a Message) -> Result<&'a str, ProcessError> {
        message
            .device_id
            .as_deref()
            .ok_or_else(|| ProcessError::RoutingMiss {
                kind,
                path: message.path(),
            })
    }

    /// Apply a message to the tree and return the event describing the change, if any.
    pub fn process(&self, message: Message) -> Result<Option<Event>, ProcessError> {
        if let Some(log) = &self.log {
            log.append(&message);
        }
        let received_at = message.received_at;
        match &message.kind {
            MessageKind::NodeBirth => {
                if message.metrics.is_empty() {
                    warn!("NBIRTH {}: birth certificate has no metrics", message.path());
                    self.warnings.record();
                    return Ok(None);
                }
                let group = self
                    .groups
                    .write()
                    .entry(message.group_id.clone())
                    .or_insert_with(|| {
                        debug!("NBIRTH: new group {}", message.group_id);
                        Arc::new(Group::new(
                            &message.group_id,
                            received_at,
                            self.warnings.clone(),
                        ))
                    })
                    .clone();
                Ok(group.node_birth(&message.node_id, received_at, &message.metrics))
            }
            MessageKind::NodeData => self.group("NDATA", &message)?.node_data(
                &message.node_id,
                received_at,
                &message.metrics,
            ),
            MessageKind::NodeDeath => {
                self.group("NDEATH", &message)?
                    .node_death(&message.node_id, received_at)
            }
            MessageKind::DeviceBirth => {
                let device_id = Self::device_id("DBIRTH", &message)?;
                self.group("DBIRTH", &message)?.device_birth(
                    &message.node_id,
                    device_id,
                    received_at,
                    &message.metrics,
                )
            }
            MessageKind::DeviceData => {
                let device_id = Self::device_id("DDATA", &message)?;
                self.group("DDATA", &message)?.device_data(
                    &message.node_id,
                    device_id,
                    received_at,
                    &message.metrics,
                )
            }
            MessageKind::DeviceDeath => {
                let device_id = Self::device_id("DDEATH", &message)?;
                self.group("DDEATH", &message)?.device_death(
                    &message.node_id,
                    device_id,
                    received_at,
                )
            }
            MessageKind::NodeCommand | MessageKind::DeviceCommand => {
                debug!("{} {}: command ignored", message.kind.as_str(), message.path());
                Ok(None)
            }
            MessageKind::Unknown(verb) => Err(ProcessError::UnknownMessageKind(verb.clone())),
        }
    }

    /// Snapshot every group, sorted by group id
    pub fn fetch_all(&self) -> Vec<GroupView> {
        let groups: Vec<Arc<Group>> = self.groups.read().values().cloned().collect();
        groups.iter().map(|group| group.fetch_full()).collect()
    }

    pub fn group_by_id(&self, group_id: &str) -> Option<Arc<Group>> {
        self.groups.read().get(group_id).cloned()
    }

    /// Number of metrics and messages rejected so far
    pub fn warnings(&self) -> u64 {
        self.warnings.count()
    }

    /// Processed messages, empty when recording is disabled
    pub fn messages(&self) -> Vec<LogEntry> {
        self.log
            .as_ref()
            .map(|log| log.entries())
            .unwrap_or_default()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}
