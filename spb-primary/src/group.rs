use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use serde::Serialize;
use spb_types::payload;

use crate::{
    device::advance,
    error::ProcessError,
    event::Event,
    metric::Warnings,
    node::{FullNode, Node},
};

/// Snapshot of a group and everything beneath it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: String,
    pub last_message_at: DateTime<Utc>,
    pub nodes: Vec<FullNode>,
}

struct GroupInner {
    last_message_at: DateTime<Utc>,
    nodes: BTreeMap<String, Arc<Node>>,
}

pub struct Group {
    group_id: String,
    warnings: Arc<Warnings>,
    inner: RwLock<GroupInner>,
}

impl Group {
    pub(crate) fn new(group_id: &str, created_at: DateTime<Utc>, warnings: Arc<Warnings>) -> Self {
        Self {
            group_id: group_id.into(),
            warnings,
            inner: RwLock::new(GroupInner {
                last_message_at: created_at,
                nodes: BTreeMap::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.group_id
    }

    pub fn node(&self, node_id: &str) -> Option<Arc<Node>> {
        self.inner.read().nodes.get(node_id).cloned()
    }

    fn touch(&self, received_at: DateTime<Utc>) {
        advance(&mut self.inner.write().last_message_at, received_at);
    }

    /// Look up a node. The group lock is released before the node is returned.
    fn route(&self, kind: &'static str, node_id: &str) -> Result<Arc<Node>, ProcessError> {
        match self.node(node_id) {
            Some(node) => Ok(node),
            None => {
                debug!("{kind}: node {node_id} is not known to group {}", self.group_id);
                Err(ProcessError::RoutingMiss {
                    kind,
                    path: format!("{}/{node_id}", self.group_id),
                })
            }
        }
    }

    /// Advance the last message time only when the node accepted the message
    fn accepted(&self, event: Option<Event>, received_at: DateTime<Utc>) -> Option<Event> {
        if event.is_some() {
            self.touch(received_at);
        }
        event
    }

    /// Handle a node birth, creating the node on first sight
    pub fn node_birth(
        &self,
        node_id: &str,
        received_at: DateTime<Utc>,
        metrics: &[payload::Metric],
    ) -> Option<Event> {
        let node = {
            let mut inner = self.inner.write();
            inner
                .nodes
                .entry(node_id.to_string())
                .or_insert_with(|| {
                    debug!("NBIRTH: new node {}/{node_id}", self.group_id);
                    Arc::new(Node::new(
                        &self.group_id,
                        node_id,
                        received_at,
                        self.warnings.clone(),
                    ))
                })
                .clone()
        };
        self.accepted(node.birth(received_at, metrics), received_at)
    }

    pub fn node_data(
        &self,
        node_id: &str,
        received_at: DateTime<Utc>,
        metrics: &[payload::Metric],
    ) -> Result<Option<Event>, ProcessError> {
        let node = self.route("NDATA", node_id)?;
        Ok(self.accepted(node.data(received_at, metrics), received_at))
    }

    pub fn node_death(&self, node_id: &str, received_at: DateTime<Utc>) -> Result<Option<Event>, ProcessError> {
        let node = self.route("NDEATH", node_id)?;
        Ok(self.accepted(Some(node.death(received_at)), received_at))
    }

    pub fn device_birth(
        &self,
        node_id: &str,
        device_id: &str,
        received_at: DateTime<Utc>,
        metrics: &[payload::Metric],
    ) -> Result<Option<Event>, ProcessError> {
        let node = self.route("DBIRTH", node_id)?;
        Ok(self.accepted(node.device_birth(device_id, received_at, metrics), received_at))
    }

    pub fn device_data(
        &self,
        node_id: &str,
        device_id: &str,
        received_at: DateTime<Utc>,
        metrics: &[payload::Metric],
    ) -> Result<Option<Event>, ProcessError> {
        let node = self.route("DDATA", node_id)?;
        let event = node.device_data(device_id, received_at, metrics)?;
        Ok(self.accepted(event, received_at))
    }

    pub fn device_death(
        &self,
        node_id: &str,
        device_id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<Option<Event>, ProcessError> {
        let node = self.route("DDEATH", node_id)?;
        let event = node.device_death(device_id, received_at)?;
        Ok(self.accepted(Some(event), received_at))
    }

    pub fn last_message_at(&self) -> DateTime<Utc> {
        self.inner.read().last_message_at
    }

    pub fn fetch_full(&self) -> GroupView {
        let inner = self.inner.read();
        GroupView {
            id: self.group_id.clone(),
            last_message_at: inner.last_message_at,
            nodes: inner.nodes.values().map(|node| node.fetch_full()).collect(),
        }
    }
}
