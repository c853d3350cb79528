use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use log::{debug, info, warn};
use spb_client::{Client, DynClient, DynEventLoop, Event, EventLoop, LastWill, MessageError, StatePayload};
use spb_types::{
    topic::{QoS, StateTopic, Topic, TopicFilter},
    utils::{timestamp, validate_name},
};
use tokio::{
    select,
    sync::mpsc::{self, Receiver},
    task,
    time::timeout,
};

use crate::{config::SubscriptionConfig, error::HostError, message::Message};

struct Shutdown;

struct HostState {
    host_id: String,
    published_online_state: AtomicBool,
}

/// Handle used to stop a running [Host]
#[derive(Clone)]
pub struct HostClient {
    client: Arc<DynClient>,
    sender: mpsc::Sender<Shutdown>,
    state: Arc<HostState>,
}

impl HostClient {
    /// Publish the offline STATE message, disconnect from the broker and stop the [Host].
    ///
    /// The host produces [HostEvent::Cancelled] once it has shut down.
    pub async fn cancel(&self) {
        info!("Host {} stopping", self.state.host_id);
        let topic = StateTopic::new_host(&self.state.host_id);
        if self
            .client
            .try_publish_state_message(topic, StatePayload::Offline { timestamp: timestamp() })
            .await
            .is_err()
        {
            debug!("Unable to publish state offline on exit");
        }
        _ = self.sender.send(Shutdown).await;
        _ = self.client.disconnect().await;
    }

    pub fn host_id(&self) -> &str {
        &self.state.host_id
    }
}

/// Something that happened while polling the [Host]
#[derive(Debug, PartialEq)]
pub enum HostEvent {
    /// Connected to the broker
    Online,
    /// Disconnected from the broker
    Offline,
    /// A node or device message, stamped with the time it was received
    Message(Message),
    /// A publish that could not be decoded
    InvalidPublish { reason: MessageError, topic: String },
    Cancelled,
}

/// A Sparkplug primary host session.
///
/// Manages the host's STATE messages and subscriptions, and turns node and device publishes into
/// [Message]s.
pub struct Host {
    online: bool,
    state: Arc<HostState>,
    will_timestamp: u64,
    subscription_config: SubscriptionConfig,
    client: HostClient,
    eventloop: Box<DynEventLoop>,
    shutdown_rx: Receiver<Shutdown>,
}

impl Host {
    pub fn new<S, E, C>(
        host_id: S,
        subscription_config: SubscriptionConfig,
        eventloop: E,
        client: C,
    ) -> Result<(Self, HostClient), HostError>
    where
        S: Into<String>,
        E: EventLoop + Send + 'static,
        C: Client + Send + Sync + 'static,
    {
        let host_id: String = host_id.into();
        validate_name(&host_id).map_err(HostError::InvalidHostId)?;

        let (tx, rx) = mpsc::channel(1);
        let state = Arc::new(HostState {
            host_id,
            published_online_state: AtomicBool::new(false),
        });
        let client = HostClient {
            client: Arc::new(client),
            sender: tx,
            state: state.clone(),
        };
        let mut host = Self {
            online: false,
            state,
            will_timestamp: 0,
            subscription_config,
            client: client.clone(),
            eventloop: Box::new(eventloop),
            shutdown_rx: rx,
        };
        host.update_last_will();
        Ok((host, client))
    }

    fn update_last_will(&mut self) {
        self.will_timestamp = timestamp();
        self.eventloop
            .set_last_will(LastWill::new_app(&self.state.host_id, self.will_timestamp));
    }

    fn handle_online(&mut self) -> Option<HostEvent> {
        if self.online {
            return None;
        }
        info!("Host {} online", self.state.host_id);
        self.online = true;
        let client = self.client.client.clone();
        let state_topic = StateTopic::new_host(&self.state.host_id);
        let mut topics: Vec<TopicFilter> = self.subscription_config.clone().into();
        // the namespace wildcard already covers STATE
        if self.subscription_config != SubscriptionConfig::AllGroups {
            topics.push(TopicFilter::new_with_qos(
                Topic::State(state_topic.clone()),
                QoS::AtMostOnce,
            ));
        }
        let timestamp = self.will_timestamp;
        let state = self.state.clone();
        task::spawn(async move {
            if client.subscribe_many(topics).await.is_err() {
                warn!("Failed to subscribe");
            }
            if client
                .publish_state_message(state_topic, StatePayload::Online { timestamp })
                .await
                .is_ok()
            {
                state.published_online_state.store(true, Ordering::SeqCst);
            }
        });
        Some(HostEvent::Online)
    }

    fn handle_offline(&mut self) -> Option<HostEvent> {
        if !self.online {
            return None;
        }
        info!("Host {} offline", self.state.host_id);
        self.online = false;
        self.state.published_online_state.store(false, Ordering::SeqCst);
        self.update_last_will();
        Some(HostEvent::Offline)
    }

    /// Another client published our host as offline, typically a stale will. Correct it.
    fn handle_state(&self, host_id: String, payload: StatePayload) {
        if host_id != self.state.host_id
            || !self.state.published_online_state.load(Ordering::SeqCst)
        {
            return;
        }
        if let StatePayload::Offline { .. } = payload {
            debug!("Received offline STATE for own host, republishing online");
            let topic = StateTopic::new_host(&self.state.host_id);
            let client = self.client.client.clone();
            let timestamp = self.will_timestamp;
            task::spawn(async move {
                _ = client
                    .publish_state_message(topic, StatePayload::Online { timestamp })
                    .await;
            });
        }
    }

    fn handle_event(&mut self, event: Event) -> Option<HostEvent> {
        match event {
            Event::Offline => self.handle_offline(),
            Event::Online => self.handle_online(),
            Event::Node(message) => Some(HostEvent::Message(Message::from_node(message, Utc::now()))),
            Event::Device(message) => {
                Some(HostEvent::Message(Message::from_device(message, Utc::now())))
            }
            Event::State { host_id, payload } => {
                self.handle_state(host_id, payload);
                None
            }
            Event::InvalidPublish { reason, topic, .. } => {
                let topic = String::from_utf8_lossy(&topic).into_owned();
                warn!("Dropping invalid publish on {topic}: {reason}");
                Some(HostEvent::InvalidPublish { reason, topic })
            }
        }
    }

    async fn poll_until_offline(&mut self) {
        while self.online {
            if Event::Offline == self.eventloop.poll().await {
                self.handle_offline();
            }
        }
    }

    /// Progress the host. Continuing to poll reconnects after a disconnection.
    pub async fn poll(&mut self) -> HostEvent {
        loop {
            select! {
                event = self.eventloop.poll() => {
                    if let Some(host_event) = self.handle_event(event) {
                        return host_event
                    }
                }
                Some(_) = self.shutdown_rx.recv() => {
                    _ = timeout(Duration::from_secs(1), self.poll_until_offline()).await;
                    return HostEvent::Cancelled
                },
            }
        }
    }

    /// Poll until cancelled, forwarding every message to the ingestion channel.
    pub async fn run(mut self, messages: mpsc::Sender<Message>) {
        loop {
            match self.poll().await {
                HostEvent::Message(message) => {
                    if messages.send(message).await.is_err() {
                        warn!("Ingestion channel closed, host stopping");
                        break;
                    }
                }
                HostEvent::Cancelled => break,
                HostEvent::Online | HostEvent::Offline | HostEvent::InvalidPublish { .. } => (),
            }
        }
        info!("Host {} stopped", self.state.host_id);
    }
}
