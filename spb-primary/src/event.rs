use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{device::DeviceView, metric::MetricView, node::NodeView};

/// A state change derived from a processed message.
///
/// Serializes as `{"type": "NBIRTH", "timestamp": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    #[serde(rename = "NBIRTH")]
    NodeBirth(NodeMetricsEvent),
    #[serde(rename = "NDATA")]
    NodeData(NodeMetricsEvent),
    #[serde(rename = "NDEATH")]
    NodeDeath(NodeEvent),
    #[serde(rename = "DBIRTH")]
    DeviceBirth(DeviceMetricsEvent),
    #[serde(rename = "DDATA")]
    DeviceData(DeviceMetricsEvent),
    #[serde(rename = "DDEATH")]
    DeviceDeath(DeviceEvent),
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::NodeBirth(_) => "NBIRTH",
            EventPayload::NodeData(_) => "NDATA",
            EventPayload::NodeDeath(_) => "NDEATH",
            EventPayload::DeviceBirth(_) => "DBIRTH",
            EventPayload::DeviceData(_) => "DDATA",
            EventPayload::DeviceDeath(_) => "DDEATH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetricsEvent {
    pub node: NodeView,
    pub node_metrics: Vec<MetricView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeEvent {
    pub node: NodeView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetricsEvent {
    pub node: NodeView,
    pub device: DeviceView,
    pub device_metrics: Vec<MetricView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEvent {
    pub node: NodeView,
    pub device: DeviceView,
}
