use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::Serialize;
use spb_types::payload;

use crate::{
    device::{advance, Device, FullDevice},
    error::ProcessError,
    event::{DeviceEvent, DeviceMetricsEvent, Event, EventPayload, NodeEvent, NodeMetricsEvent},
    metric::{MetricSet, MetricView, Warnings},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: String,
    pub group_id: String,
    pub online: bool,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullNode {
    #[serde(flatten)]
    pub node: NodeView,
    pub devices: Vec<FullDevice>,
    pub metrics: Vec<MetricView>,
}

struct NodeInner {
    online: bool,
    last_message_at: DateTime<Utc>,
    metrics: MetricSet,
    devices: BTreeMap<String, Arc<Device>>,
}

/// State of a single edge node and its devices
pub struct Node {
    group_id: String,
    node_id: String,
    warnings: Arc<Warnings>,
    inner: RwLock<NodeInner>,
}

impl Node {
    pub(crate) fn new(
        group_id: &str,
        node_id: &str,
        created_at: DateTime<Utc>,
        warnings: Arc<Warnings>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            node_id: node_id.into(),
            warnings,
            inner: RwLock::new(NodeInner {
                online: false,
                last_message_at: created_at,
                metrics: MetricSet::default(),
                devices: BTreeMap::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.node_id
    }

    fn scope(&self, kind: &str) -> String {
        format!("{kind} {}/{}", self.group_id, self.node_id)
    }

    fn view(&self, inner: &NodeInner) -> NodeView {
        NodeView {
            id: self.node_id.clone(),
            group_id: self.group_id.clone(),
            online: inner.online,
            last_message_at: inner.last_message_at,
        }
    }

    /// Advance the last message time and return the node view with it
    fn touch(&self, received_at: DateTime<Utc>) -> NodeView {
        let mut inner = self.inner.write();
        advance(&mut inner.last_message_at, received_at);
        self.view(&inner)
    }

    fn device_or_miss(&self, kind: &'static str, device_id: &str) -> Result<Arc<Device>, ProcessError> {
        match self.device(device_id) {
            Some(device) => Ok(device),
            None => {
                debug!("{kind}: device {device_id} is not known to node {}", self.node_id);
                Err(ProcessError::RoutingMiss {
                    kind,
                    path: format!("{}/{}/{device_id}", self.group_id, self.node_id),
                })
            }
        }
    }

    pub fn birth(&self, received_at: DateTime<Utc>, metrics: &[payload::Metric]) -> Option<Event> {
        let scope = self.scope("NBIRTH");
        if metrics.is_empty() {
            warn!("{scope}: birth certificate has no metrics");
            self.warnings.record();
            return None;
        }
        let metrics = MetricSet::from_birth(&scope, metrics, &self.warnings);
        let mut inner = self.inner.write();
        advance(&mut inner.last_message_at, received_at);
        inner.online = true;
        inner.metrics = metrics;
        debug!("{scope}: online with {} metrics", inner.metrics.len());
        Some(Event {
            timestamp: inner.last_message_at,
            payload: EventPayload::NodeBirth(NodeMetricsEvent {
                node: self.view(&inner),
                node_metrics: inner.metrics.snapshot(false),
            }),
        })
    }

    pub fn data(&self, received_at: DateTime<Utc>, metrics: &[payload::Metric]) -> Option<Event> {
        let scope = self.scope("NDATA");
        if metrics.is_empty() {
            warn!("{scope}: data message has no metrics");
            self.warnings.record();
            return None;
        }
        let mut inner = self.inner.write();
        advance(&mut inner.last_message_at, received_at);
        inner.metrics.apply_data(&scope, metrics, &self.warnings);
        Some(Event {
            timestamp: inner.last_message_at,
            payload: EventPayload::NodeData(NodeMetricsEvent {
                node: self.view(&inner),
                node_metrics: inner.metrics.snapshot(!inner.online),
            }),
        })
    }

    /// Mark the node and every device beneath it offline
    pub fn death(&self, received_at: DateTime<Utc>) -> Event {
        let mut inner = self.inner.write();
        advance(&mut inner.last_message_at, received_at);
        inner.online = false;
        // device locks nest under the node lock
        for device in inner.devices.values() {
            device.set_offline();
        }
        debug!("{}: offline", self.scope("NDEATH"));
        Event {
            timestamp: inner.last_message_at,
            payload: EventPayload::NodeDeath(NodeEvent {
                node: self.view(&inner),
            }),
        }
    }

    /// Handle a device birth, creating the device on first sight
    pub fn device_birth(
        &self,
        device_id: &str,
        received_at: DateTime<Utc>,
        metrics: &[payload::Metric],
    ) -> Option<Event> {
        if metrics.is_empty() {
            warn!(
                "DBIRTH {}/{}/{device_id}: birth certificate has no metrics",
                self.group_id, self.node_id
            );
            self.warnings.record();
            return None;
        }
        let device = {
            let mut inner = self.inner.write();
            inner
                .devices
                .entry(device_id.to_string())
                .or_insert_with(|| {
                    debug!("DBIRTH: new device {}/{}/{device_id}", self.group_id, self.node_id);
                    Arc::new(Device::new(
                        &self.group_id,
                        &self.node_id,
                        device_id,
                        received_at,
                        self.warnings.clone(),
                    ))
                })
                .clone()
        };
        let full = device.birth(received_at, metrics)?;
        let node = self.touch(received_at);
        Some(Event {
            timestamp: node.last_message_at,
            payload: EventPayload::DeviceBirth(DeviceMetricsEvent {
                node,
                device: full.device,
                device_metrics: full.metrics,
            }),
        })
    }

    pub fn device_data(
        &self,
        device_id: &str,
        received_at: DateTime<Utc>,
        metrics: &[payload::Metric],
    ) -> Result<Option<Event>, ProcessError> {
        let device = self.device_or_miss("DDATA", device_id)?;
        let Some(full) = device.data(received_at, metrics) else {
            return Ok(None);
        };
        let node = self.touch(received_at);
        Ok(Some(Event {
            timestamp: node.last_message_at,
            payload: EventPayload::DeviceData(DeviceMetricsEvent {
                node,
                device: full.device,
                device_metrics: full.metrics,
            }),
        }))
    }

    pub fn device_death(
        &self,
        device_id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<Event, ProcessError> {
        let device = self.device_or_miss("DDEATH", device_id)?;
        let node = self.touch(received_at);
        let device = device.death(received_at);
        Ok(Event {
            timestamp: node.last_message_at,
            payload: EventPayload::DeviceDeath(DeviceEvent { node, device }),
        })
    }

    pub fn device(&self, device_id: &str) -> Option<Arc<Device>> {
        self.inner.read().devices.get(device_id).cloned()
    }

    pub fn is_online(&self) -> bool {
        self.inner.read().online
    }

    pub fn fetch(&self) -> NodeView {
        self.view(&self.inner.read())
    }

    /// Snapshot the node with its metrics and devices, devices sorted by id
    pub fn fetch_full(&self) -> FullNode {
        let inner = self.inner.read();
        FullNode {
            node: self.view(&inner),
            devices: inner.devices.values().map(|d| d.fetch_full()).collect(),
            metrics: inner.metrics.snapshot(!inner.online),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spb_types::payload::{metric::Value, DataType, Metric};

    fn node() -> Node {
        Node::new("G", "N1", Utc::now(), Arc::new(Warnings::default()))
    }

    fn metric(alias: u64) -> Metric {
        let mut metric = Metric::new();
        metric
            .set_alias(alias)
            .set_name(format!("m{alias}"))
            .set_datatype(DataType::Boolean)
            .set_value(Value::BooleanValue(true));
        metric
    }

    #[test]
    fn death_cascades_to_devices() {
        let node = node();
        let now = Utc::now();
        node.birth(now, &[metric(0)]).unwrap();
        node.device_birth("D1", now, &[metric(1)]).unwrap();
        node.device_birth("D2", now, &[metric(1)]).unwrap();
        assert!(node.device("D1").unwrap().is_online());

        let event = node.death(now);
        assert_eq!(event.payload.kind(), "NDEATH");
        assert!(!node.is_online());
        let full = node.fetch_full();
        assert_eq!(full.devices.len(), 2);
        for device in full.devices {
            assert!(!device.device.online);
            assert!(device.metrics.iter().all(|m| m.stale));
        }
    }

    #[test]
    fn device_birth_without_metrics_creates_nothing() {
        let node = node();
        assert!(node.device_birth("D1", Utc::now(), &[]).is_none());
        assert!(node.device("D1").is_none());
    }

    #[test]
    fn unknown_device_is_routing_miss() {
        let node = node();
        node.birth(Utc::now(), &[metric(0)]).unwrap();
        let err = node.device_data("D9", Utc::now(), &[metric(1)]).unwrap_err();
        assert_eq!(
            err,
            ProcessError::RoutingMiss {
                kind: "DDATA",
                path: "G/N1/D9".into()
            }
        );
        assert!(node.device_death("D9", Utc::now()).is_err());
        assert!(node.device("D9").is_none());
    }

    #[test]
    fn devices_sorted_by_id() {
        let node = node();
        let now = Utc::now();
        for id in ["b", "c", "a"] {
            node.device_birth(id, now, &[metric(1)]).unwrap();
        }
        let ids: Vec<String> = node
            .fetch_full()
            .devices
            .into_iter()
            .map(|d| d.device.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
