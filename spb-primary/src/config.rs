use spb_types::topic::{QoS, Topic, TopicFilter};

/// A part of the Sparkplug namespace to subscribe to
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceSubConfig {
    Group { group_id: String },
    Node { group_id: String, node_id: String },
}

impl From<NamespaceSubConfig> for TopicFilter {
    fn from(value: NamespaceSubConfig) -> Self {
        match value {
            NamespaceSubConfig::Group { group_id } => {
                TopicFilter::new_with_qos(Topic::Group { id: group_id }, QoS::AtMostOnce)
            }
            NamespaceSubConfig::Node { group_id, node_id } => {
                TopicFilter::new_with_qos(Topic::Node { group_id, node_id }, QoS::AtMostOnce)
            }
        }
    }
}

/// Which groups the host subscribes to once connected
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionConfig {
    AllGroups,
    SingleGroup { group_id: String },
    Custom(Vec<NamespaceSubConfig>),
}

impl SubscriptionConfig {
    /// Build a config from a list of group ids, an empty list meaning every group
    pub fn from_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups: Vec<NamespaceSubConfig> = groups
            .into_iter()
            .map(|group_id| NamespaceSubConfig::Group {
                group_id: group_id.into(),
            })
            .collect();
        match groups.len() {
            0 => SubscriptionConfig::AllGroups,
            1 => match groups.remove(0) {
                NamespaceSubConfig::Group { group_id } => SubscriptionConfig::SingleGroup { group_id },
                other => SubscriptionConfig::Custom(vec![other]),
            },
            _ => SubscriptionConfig::Custom(groups),
        }
    }
}

impl From<SubscriptionConfig> for Vec<TopicFilter> {
    fn from(value: SubscriptionConfig) -> Self {
        match value {
            SubscriptionConfig::AllGroups => vec![TopicFilter::new(Topic::Namespace)],
            SubscriptionConfig::SingleGroup { group_id } => {
                vec![TopicFilter::new(Topic::Group { id: group_id })]
            }
            SubscriptionConfig::Custom(namespace_sub_configs) => namespace_sub_configs
                .into_iter()
                .map(TopicFilter::from)
                .collect(),
        }
    }
}
