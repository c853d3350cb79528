use crate::constants::{DBIRTH, DCMD, DDATA, DDEATH, NBIRTH, NCMD, NDATA, NDEATH, SPBV01, STATE};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeviceMessage {
    DBirth,
    DDeath,
    DData,
    DCmd,
}

impl DeviceMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceMessage::DBirth => DBIRTH,
            DeviceMessage::DDeath => DDEATH,
            DeviceMessage::DData => DDATA,
            DeviceMessage::DCmd => DCMD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeMessage {
    NBirth,
    NDeath,
    NData,
    NCmd,
}

impl NodeMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeMessage::NBirth => NBIRTH,
            NodeMessage::NDeath => NDEATH,
            NodeMessage::NData => NDATA,
            NodeMessage::NCmd => NCMD,
        }
    }
}

/// A topic a node publishes on
#[derive(Clone, Debug, PartialEq)]
pub struct NodeTopic {
    pub topic: String,
    pub message_type: NodeMessage,
}

impl NodeTopic {
    pub fn new(group_id: &str, message_type: NodeMessage, node_id: &str) -> Self {
        Self {
            topic: node_topic(group_id, &message_type, node_id),
            message_type,
        }
    }
}

/// A topic a device publishes on
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceTopic {
    pub topic: String,
    pub message_type: DeviceMessage,
}

impl DeviceTopic {
    pub fn new(group_id: &str, message_type: DeviceMessage, node_id: &str, device_id: &str) -> Self {
        Self {
            topic: device_topic(group_id, &message_type, node_id, device_id),
            message_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StateTopic {
    pub topic: String,
}

impl StateTopic {
    /// Topic filter matching the STATE messages of every host
    pub fn new() -> Self {
        Self {
            topic: state_sub_topic(),
        }
    }

    pub fn new_host(host_id: &str) -> Self {
        Self {
            topic: state_host_topic(host_id),
        }
    }
}

impl Default for StateTopic {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Topic {
    NodeTopic(NodeTopic),
    DeviceTopic(DeviceTopic),
    State(StateTopic),
    Node { group_id: String, node_id: String },
    Group { id: String },
    Namespace,
}

impl From<Topic> for String {
    fn from(value: Topic) -> Self {
        match value {
            Topic::NodeTopic(node_topic) => node_topic.topic,
            Topic::DeviceTopic(device_topic) => device_topic.topic,
            Topic::State(state_topic) => state_topic.topic,
            Topic::Node { group_id, node_id } => format!("{SPBV01}/{group_id}/+/{node_id}/#"),
            Topic::Group { id } => format!("{SPBV01}/{id}/#"),
            Topic::Namespace => format!("{SPBV01}/#"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicFilter {
    pub topic: Topic,
    pub qos: QoS,
}

impl TopicFilter {
    pub fn new(topic: Topic) -> Self {
        Self::new_with_qos(topic, QoS::AtMostOnce)
    }

    pub fn new_with_qos(topic: Topic, qos: QoS) -> Self {
        Self { topic, qos }
    }
}

pub fn node_topic(group_id: &str, message_type: &NodeMessage, node_id: &str) -> String {
    format!("{SPBV01}/{group_id}/{}/{node_id}", message_type.as_str())
}

pub fn device_topic(
    group_id: &str,
    message_type: &DeviceMessage,
    node_id: &str,
    device_id: &str,
) -> String {
    format!(
        "{SPBV01}/{group_id}/{}/{node_id}/{device_id}",
        message_type.as_str()
    )
}

pub fn state_host_topic(host_id: &str) -> String {
    format!("{SPBV01}/{STATE}/{host_id}")
}

pub fn state_sub_topic() -> String {
    state_host_topic("+")
}
