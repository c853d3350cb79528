use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use futures::Stream;
use log::{debug, trace, warn};
use tokio::{
    select,
    sync::mpsc::{self, error::TrySendError},
};

use crate::event::Event;

/// Queue size used for the publish queue and each subscriber queue when none is configured
pub const DEFAULT_CAPACITY: usize = 10;

enum Command {
    Subscribe {
        id: u64,
        tx: mpsc::Sender<Arc<Event>>,
        dropped: Arc<AtomicU64>,
    },
    Unsubscribe(u64),
}

struct Subscriber {
    tx: mpsc::Sender<Arc<Event>>,
    dropped: Arc<AtomicU64>,
}

struct Dispatcher {
    publish_rx: mpsc::Receiver<Arc<Event>>,
    control_rx: mpsc::UnboundedReceiver<Command>,
    subscribers: HashMap<u64, Subscriber>,
}

impl Dispatcher {
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe { id, tx, dropped } => {
                debug!("Subscriber {id} registered");
                self.subscribers.insert(id, Subscriber { tx, dropped });
            }
            Command::Unsubscribe(id) => {
                if self.subscribers.remove(&id).is_some() {
                    debug!("Subscriber {id} removed");
                }
            }
        }
    }

    fn dispatch(&mut self, event: Arc<Event>) {
        trace!("Dispatching {} to {} subscribers", event.payload.kind(), self.subscribers.len());
        self.subscribers.retain(|id, subscriber| {
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    subscriber.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("Subscriber {id} queue full, dropping {}", event.payload.kind());
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }

    async fn run(mut self) {
        loop {
            select! {
                biased;
                Some(command) = self.control_rx.recv() => self.handle_command(command),
                maybe_event = self.publish_rx.recv() => match maybe_event {
                    Some(event) => self.dispatch(event),
                    None => break, // every Broadcaster handle has been dropped
                },
            }
        }
        debug!("Broadcaster stopped");
    }
}

/// Fans events out to any number of subscribers without ever blocking the publisher.
///
/// Events that do not fit in the publish queue, or in a subscriber's queue, are dropped.
/// Cloning yields another handle onto the same broadcaster. The dispatch task stops once every
/// handle has been dropped, which ends all subscriptions.
#[derive(Clone)]
pub struct Broadcaster {
    publish_tx: mpsc::Sender<Arc<Event>>,
    control_tx: mpsc::UnboundedSender<Command>,
    capacity: usize,
    next_id: Arc<AtomicU64>,
    subscriber_count: Arc<AtomicUsize>,
    dropped: Arc<AtomicU64>,
}

impl Broadcaster {
    /// Create a broadcaster and spawn its dispatch task. Must be called from within a tokio runtime.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (publish_tx, publish_rx) = mpsc::channel(capacity);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            publish_rx,
            control_rx,
            subscribers: HashMap::new(),
        };
        tokio::spawn(dispatcher.run());
        Self {
            publish_tx,
            control_tx,
            capacity,
            next_id: Arc::new(AtomicU64::new(0)),
            subscriber_count: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event for delivery. Never blocks.
    pub fn publish(&self, event: Event) {
        match self.publish_tx.try_send(Arc::new(event)) {
            Ok(()) => (),
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Publish queue full, dropping {} event", event.payload.kind());
            }
            Err(TrySendError::Closed(event)) => {
                warn!("Broadcaster stopped, dropping {} event", event.payload.kind());
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let registered = self
            .control_tx
            .send(Command::Subscribe {
                id,
                tx,
                dropped: dropped.clone(),
            })
            .is_ok();
        if registered {
            self.subscriber_count.fetch_add(1, Ordering::Relaxed);
        }
        Subscription {
            id,
            rx,
            control_tx: self.control_tx.clone(),
            subscriber_count: self.subscriber_count.clone(),
            dropped,
            registered,
        }
    }

    /// Deregister a subscription. Equivalent to [Subscription::close].
    pub fn unsubscribe(&self, mut subscription: Subscription) {
        subscription.close();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::Relaxed)
    }

    /// Number of events dropped because the publish queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A live feed of events from a [Broadcaster].
///
/// Dropping the subscription deregisters it.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Arc<Event>>,
    control_tx: mpsc::UnboundedSender<Command>,
    subscriber_count: Arc<AtomicUsize>,
    dropped: Arc<AtomicU64>,
    registered: bool,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the subscription is closed or the broadcaster stops.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }

    /// Stop receiving. Events already queued can still be read with [Subscription::recv].
    pub fn close(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        self.subscriber_count.fetch_sub(1, Ordering::Relaxed);
        // the dispatcher may already be gone
        let _ = self.control_tx.send(Command::Unsubscribe(self.id));
        self.rx.close();
    }

    /// Number of events this subscriber missed because its queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Stream for Subscription {
    type Item = Arc<Event>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
