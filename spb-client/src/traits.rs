use async_trait::async_trait;
use spb_types::topic::{StateTopic, TopicFilter};

use crate::{Event, LastWill, StatePayload};

#[async_trait]
pub trait Client {
    /// Disconnects the client.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the disconnection was successful
    /// - `Err(())` if the disconnection failed
    async fn disconnect(&self) -> Result<(), ()>;

    /// Publishes a state message to the specified state topic.
    ///
    /// This method will yield to the async runtime until the message is accepted by the client
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the message was successfully published
    /// - `Err(())` if the publication failed
    async fn publish_state_message(&self, topic: StateTopic, payload: StatePayload) -> Result<(), ()>;

    /// Attempts to publish a state message to the specified state topic.
    ///
    /// Unlike `publish_state_message`, this method may return early if the client cannot process the message
    /// e.g the message queue is full.
    async fn try_publish_state_message(
        &self,
        topic: StateTopic,
        payload: StatePayload,
    ) -> Result<(), ()>;

    /// Subscribes to a single topic.
    ///
    /// This is a convenience method that calls `subscribe_many` with a single topic.
    async fn subscribe(&self, topic: TopicFilter) -> Result<(), ()> {
        self.subscribe_many(vec![topic]).await
    }

    /// Subscribes to multiple topics in a single operation.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if all subscriptions were successful
    /// - `Err(())` if any subscription failed
    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ()>;
}

pub type DynClient = dyn Client + Send + Sync;

/// Drives a connection and produces transport [Event]s
#[async_trait]
pub trait EventLoop {
    /// Poll for the next event. Implementations handle reconnection internally.
    async fn poll(&mut self) -> Event;
    /// Set the last will to register with the broker on the next connection
    fn set_last_will(&mut self, will: LastWill);
}

pub type DynEventLoop = dyn EventLoop + Send;
