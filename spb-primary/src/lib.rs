//! A [Sparkplug](https://sparkplug.eclipse.org/) B primary host.
//!
//! Tracks the state of every group, edge node, device and metric seen on a broker and
//! streams the resulting state changes to subscribers.
//!
//! Data flows one way:
//!
//! * The [Host] turns broker publishes into [Message]s and sends them over a bounded channel.
//! * A single writer task ([spawn_writer]) applies each message to the [Store].
//! * Every resulting [Event] goes to the [Broadcaster], which fans it out to its [Subscription]s.
//!
//! Readers snapshot the store at any time with [Store::fetch_all].

mod broadcast;
mod config;
mod device;
mod error;
mod event;
mod group;
mod host;
mod message;
mod message_log;
mod metric;
mod node;
mod store;
mod writer;

pub use broadcast::*;
pub use config::*;
pub use device::{Device, DeviceView, FullDevice};
pub use error::*;
pub use event::*;
pub use group::{Group, GroupView};
pub use host::*;
pub use message::*;
pub use message_log::*;
pub use metric::{Metric, MetricSet, MetricView, Warnings};
pub use node::{FullNode, Node, NodeView};
pub use store::*;
pub use writer::*;
