use std::sync::Arc;

use log::{debug, info, warn};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{broadcast::Broadcaster, error::ProcessError, message::Message, store::Store};

/// Create the bounded channel carrying messages to the writer
pub fn ingest_channel(capacity: usize) -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
    mpsc::channel(capacity.max(1))
}

/// Spawn the task that owns all store mutation.
///
/// Messages are applied in receive order and each resulting event is handed to the broadcaster.
/// The task ends once every sender of `messages` has been dropped.
pub fn spawn_writer(
    store: Arc<Store>,
    mut messages: mpsc::Receiver<Message>,
    broadcaster: Broadcaster,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            let path = message.path();
            match store.process(message) {
                Ok(Some(event)) => broadcaster.publish(event),
                Ok(None) => debug!("{path}: no state change"),
                Err(e @ ProcessError::RoutingMiss { .. }) => debug!("Dropping message: {e}"),
                Err(e) => warn!("Dropping message for {path}: {e}"),
            }
        }
        info!("Ingestion channel closed, writer stopped");
    })
}
