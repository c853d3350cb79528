//! A [spb_client::Client] and [spb_client::EventLoop] implementation over [rumqttc] MQTT v5.

mod client;
mod options;

pub use client::{Client, EventLoop};
pub use options::MqttOptions;
