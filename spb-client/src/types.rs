use std::string::FromUtf8Error;

use prost::DecodeError;
use spb_types::{
    payload::{Payload, StateBirthDeathCertificate},
    topic::{state_host_topic, QoS},
};
use thiserror::Error;

/// Error types for message processing operations.
///
/// This enum represents the various error conditions that can occur
/// when decoding sparkplug protobuf payloads, validating topics, or handling payloads.
#[derive(Error, Debug, PartialEq)]
pub enum MessageError {
    #[error("There was an error decoding the payload: {0}")]
    DecodePayloadError(#[from] DecodeError),
    #[error("The topic was invalid")]
    InvalidSparkplugTopic,
    #[error("Topic parts utf8 decode error: {0}")]
    TopicUtf8Error(#[from] FromUtf8Error),
    #[error("Unable to decode state message as json: {0}")]
    StatePayloadJsonDecodeError(String),
}

/// An enum representing the different type of message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Birth,
    Death,
    Cmd,
    Data,
    /// A verb outside the Sparkplug set, holding the full topic segment e.g. `NFOO`
    Other(String),
}

/// A Message structure containing payload and the type of topic it was received on
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub payload: Payload,
    pub kind: MessageKind,
}

/// An enum representing the different type message published on a STATE topic.
#[derive(Debug, Clone, PartialEq)]
pub enum StatePayload {
    Online { timestamp: u64 },
    Offline { timestamp: u64 },
}

impl StatePayload {
    /// Get the [QoS] and retain settings that the State message should be published with
    pub fn get_publish_quality_retain(&self) -> (QoS, bool) {
        (QoS::AtLeastOnce, true)
    }
}

impl From<StatePayload> for Vec<u8> {
    fn from(value: StatePayload) -> Self {
        match value {
            StatePayload::Online { timestamp } => {
                format!("{{\"online\" : true, \"timestamp\" : {timestamp}}}").into()
            }
            StatePayload::Offline { timestamp } => {
                format!("{{\"online\" : false, \"timestamp\" : {timestamp}}}").into()
            }
        }
    }
}

impl TryFrom<&[u8]> for StatePayload {
    type Error = MessageError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let cert = StateBirthDeathCertificate::try_from(value)
            .map_err(MessageError::StatePayloadJsonDecodeError)?;
        Ok(match cert.online {
            true => StatePayload::Online {
                timestamp: cert.timestamp,
            },
            false => StatePayload::Offline {
                timestamp: cert.timestamp,
            },
        })
    }
}

/// Represents a message from a Node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMessage {
    /// The group the node belongs to.
    pub group_id: String,
    /// The nodes unique identifier.
    pub node_id: String,
    /// The message.
    pub message: Message,
}

/// Represents a message from a Device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMessage {
    /// The group the node belongs to.
    pub group_id: String,
    /// The nodes unique identifier.
    pub node_id: String,
    /// The devices unique identifier.
    pub device_id: String,
    /// The message.
    pub message: Message,
}

/// An enum that represents the different types of events an [EventLoop](crate::EventLoop) implementation can produce.
#[derive(Debug, PartialEq)]
pub enum Event {
    Offline,
    Online,
    Node(NodeMessage),
    Device(DeviceMessage),
    State {
        host_id: String,
        payload: StatePayload,
    },
    InvalidPublish {
        reason: MessageError,
        topic: Vec<u8>,
        payload: Vec<u8>,
    },
}

/// Structure representing the last will of an Application
#[derive(Debug, Clone, PartialEq)]
pub struct LastWill {
    pub topic: String,
    pub retain: bool,
    pub qos: QoS,
    pub payload: Vec<u8>,
}

impl LastWill {
    pub fn new_app(host_id: &str, timestamp: u64) -> Self {
        let payload = StatePayload::Offline { timestamp };
        let (qos, retain) = payload.get_publish_quality_retain();
        Self {
            topic: state_host_topic(host_id),
            retain,
            qos,
            payload: payload.into(),
        }
    }
}
