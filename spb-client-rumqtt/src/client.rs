use async_trait::async_trait;
use log::{error, trace};
use rumqttc::{
    v5::{
        mqttbytes::{
            v5::{Filter, Packet},
            QoS,
        },
        AsyncClient as RuClient, EventLoop as RuEventLoop,
    },
    Outgoing,
};
use spb_types::topic::{StateTopic, TopicFilter};

use spb_client::{topic_and_payload_to_event, Event, LastWill, StatePayload};

use crate::MqttOptions;

fn qos_to_mqtt_qos(qos: spb_types::topic::QoS) -> QoS {
    match qos {
        spb_types::topic::QoS::AtMostOnce => QoS::AtMostOnce,
        spb_types::topic::QoS::AtLeastOnce => QoS::AtLeastOnce,
    }
}

fn topic_filter_to_mqtt_filter(topic_filter: TopicFilter) -> Filter {
    Filter::new(topic_filter.topic, qos_to_mqtt_qos(topic_filter.qos))
}

/// A [spb_client::Client] implementation using [rumqttc]
#[derive(Clone)]
pub struct Client {
    client: RuClient,
}

#[async_trait]
impl spb_client::Client for Client {
    async fn disconnect(&self) -> Result<(), ()> {
        self.client.disconnect().await.map_err(|_| ())
    }

    async fn publish_state_message(
        &self,
        topic: StateTopic,
        payload: StatePayload,
    ) -> Result<(), ()> {
        let (qos, retain) = payload.get_publish_quality_retain();
        self.client
            .publish(topic.topic, qos_to_mqtt_qos(qos), retain, Vec::<u8>::from(payload))
            .await
            .map_err(|_| ())
    }

    async fn try_publish_state_message(
        &self,
        topic: StateTopic,
        payload: StatePayload,
    ) -> Result<(), ()> {
        let (qos, retain) = payload.get_publish_quality_retain();
        self.client
            .try_publish(topic.topic, qos_to_mqtt_qos(qos), retain, Vec::<u8>::from(payload))
            .map_err(|_| ())
    }

    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ()> {
        let filters: Vec<Filter> = topics.into_iter().map(topic_filter_to_mqtt_filter).collect();
        self.client.subscribe_many(filters).await.map_err(|_| ())
    }
}

enum ConnectionState {
    Disconnected,
    ManualDisconnected,
    Connected,
}

/// An [spb_client::EventLoop] implementation using [rumqttc]
pub struct EventLoop {
    state: ConnectionState,
    el: RuEventLoop,
}

impl EventLoop {
    /// Create a new `Eventloop`.
    ///
    /// `options` are the mqtt options to create the rumqtt client with. Some options will be overwritten to ensure Sparkplug compliance.
    ///
    /// `cap` specifies the capacity of the bounded async channel for the client handle.
    pub fn new(options: MqttOptions, cap: usize) -> (Self, Client) {
        let (client, eventloop) = RuClient::new(options.into(), cap);
        (
            EventLoop {
                el: eventloop,
                state: ConnectionState::Disconnected,
            },
            Client { client },
        )
    }

    async fn poll_rumqtt(&mut self) -> Option<Event> {
        match self.el.poll().await {
            Ok(event) => {
                trace!("{event:?}");
                match event {
                    rumqttc::v5::Event::Incoming(Packet::ConnAck(_)) => {
                        self.state = ConnectionState::Connected;
                        Some(Event::Online)
                    }
                    rumqttc::v5::Event::Incoming(Packet::Disconnect(_)) => {
                        self.state = ConnectionState::Disconnected;
                        Some(Event::Offline)
                    }
                    rumqttc::v5::Event::Incoming(Packet::Publish(publish)) => Some(
                        topic_and_payload_to_event(publish.topic.to_vec(), publish.payload.to_vec()),
                    ),
                    rumqttc::v5::Event::Outgoing(Outgoing::Disconnect) => {
                        self.state = ConnectionState::ManualDisconnected;
                        Some(Event::Offline)
                    }
                    _ => None,
                }
            }
            Err(e) => match self.state {
                ConnectionState::Connected => {
                    error!("Client error: {e}");
                    self.state = ConnectionState::Disconnected;
                    Some(Event::Offline)
                }
                ConnectionState::Disconnected => {
                    error!("Client error on reconnect attempt: {e}");
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    None
                }
                ConnectionState::ManualDisconnected => {
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    None
                }
            },
        }
    }
}

#[async_trait]
impl spb_client::EventLoop for EventLoop {
    async fn poll(&mut self) -> Event {
        loop {
            if let Some(event) = self.poll_rumqtt().await {
                return event;
            }
        }
    }

    fn set_last_will(&mut self, will: LastWill) {
        let qos = qos_to_mqtt_qos(will.qos);
        let mqtt_will =
            rumqttc::v5::mqttbytes::v5::LastWill::new(will.topic, will.payload, qos, will.retain, None);
        self.el.options.set_last_will(mqtt_will);
    }
}
