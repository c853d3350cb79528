use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use spb_client::{topic_and_payload_to_event, DeviceMessage, Event, MessageKind as ClientKind, NodeMessage};
use spb_types::{
    constants::{DBIRTH, DCMD, DDATA, DDEATH, NBIRTH, NCMD, NDATA, NDEATH},
    payload,
};

use crate::error::IngestError;

/// The Sparkplug verb a message was published with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    NodeBirth,
    NodeData,
    NodeDeath,
    NodeCommand,
    DeviceBirth,
    DeviceData,
    DeviceDeath,
    DeviceCommand,
    /// A verb outside the Sparkplug set
    Unknown(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::NodeBirth => NBIRTH,
            MessageKind::NodeData => NDATA,
            MessageKind::NodeDeath => NDEATH,
            MessageKind::NodeCommand => NCMD,
            MessageKind::DeviceBirth => DBIRTH,
            MessageKind::DeviceData => DDATA,
            MessageKind::DeviceDeath => DDEATH,
            MessageKind::DeviceCommand => DCMD,
            MessageKind::Unknown(verb) => verb,
        }
    }

    fn from_node(kind: ClientKind) -> Self {
        match kind {
            ClientKind::Birth => MessageKind::NodeBirth,
            ClientKind::Death => MessageKind::NodeDeath,
            ClientKind::Cmd => MessageKind::NodeCommand,
            ClientKind::Data => MessageKind::NodeData,
            ClientKind::Other(verb) => MessageKind::Unknown(verb),
        }
    }

    fn from_device(kind: ClientKind) -> Self {
        match kind {
            ClientKind::Birth => MessageKind::DeviceBirth,
            ClientKind::Death => MessageKind::DeviceDeath,
            ClientKind::Cmd => MessageKind::DeviceCommand,
            ClientKind::Data => MessageKind::DeviceData,
            ClientKind::Other(verb) => MessageKind::Unknown(verb),
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A decoded node or device message, consumed once by the [Store](crate::Store)
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub received_at: DateTime<Utc>,
    pub group_id: String,
    pub node_id: String,
    pub device_id: Option<String>,
    pub kind: MessageKind,
    pub metrics: Vec<payload::Metric>,
}

impl Message {
    pub fn from_node(message: NodeMessage, received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            group_id: message.group_id,
            node_id: message.node_id,
            device_id: None,
            kind: MessageKind::from_node(message.message.kind),
            metrics: message.message.payload.metrics,
        }
    }

    pub fn from_device(message: DeviceMessage, received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            group_id: message.group_id,
            node_id: message.node_id,
            device_id: Some(message.device_id),
            kind: MessageKind::from_device(message.message.kind),
            metrics: message.message.payload.metrics,
        }
    }

    /// Decode a raw `(topic, payload)` publish into a message
    pub fn ingest(
        topic: &str,
        payload: &[u8],
        received_at: DateTime<Utc>,
    ) -> Result<Self, IngestError> {
        match topic_and_payload_to_event(topic.as_bytes().to_vec(), payload.to_vec()) {
            Event::Node(message) => Ok(Self::from_node(message, received_at)),
            Event::Device(message) => Ok(Self::from_device(message, received_at)),
            Event::InvalidPublish { reason, .. } => Err(reason.into()),
            _ => Err(IngestError::NotNodeOrDeviceTopic),
        }
    }

    /// `group/node[/device]`
    pub fn path(&self) -> String {
        match &self.device_id {
            Some(device_id) => format!("{}/{}/{}", self.group_id, self.node_id, device_id),
            None => format!("{}/{}", self.group_id, self.node_id),
        }
    }
}
