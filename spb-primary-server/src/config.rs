use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use spb_client_rumqtt::MqttOptions;
use spb_primary::{StoreOptions, SubscriptionConfig, DEFAULT_CAPACITY};

/// Sparkplug B primary host serving live group state over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "spb-primary", version, about)]
pub struct Config {
    #[arg(long, env = "MQTT_HOST", default_value = "localhost")]
    pub mqtt_host: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "spb-primary")]
    pub mqtt_client_id: String,

    #[arg(long, env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    #[arg(long, env = "SPARKPLUG_HOST_ID", default_value = "spb-primary")]
    pub host_id: String,

    /// Groups to subscribe to, all groups when empty
    #[arg(long = "group", env = "SPARKPLUG_GROUPS", value_delimiter = ',')]
    pub groups: Vec<String>,

    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: SocketAddr,

    /// Directory of static assets served at `/`
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Log filter, e.g. `info` or `spb_primary=debug`
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "EVENT_QUEUE_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub event_queue_capacity: usize,

    #[arg(long, env = "INGEST_QUEUE_CAPACITY", default_value_t = 100)]
    pub ingest_queue_capacity: usize,

    #[arg(long, env = "RECORD_MESSAGES", default_value_t = true, action = clap::ArgAction::Set)]
    pub record_messages: bool,
}

impl Config {
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.mqtt_client_id, &self.mqtt_host, self.mqtt_port);
        if let Some(username) = &self.mqtt_username {
            options.set_credentials(username, self.mqtt_password.clone().unwrap_or_default());
        }
        options
    }

    pub fn subscription_config(&self) -> SubscriptionConfig {
        SubscriptionConfig::from_groups(self.groups.iter().cloned())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            record_messages: self.record_messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["spb-primary"]);
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.event_queue_capacity, 10);
        assert!(config.record_messages);
        assert_eq!(config.subscription_config(), SubscriptionConfig::AllGroups);
    }

    #[test]
    fn groups_and_flags() {
        let config = Config::parse_from([
            "spb-primary",
            "--group",
            "a,b",
            "--record-messages",
            "false",
            "--mqtt-username",
            "user",
        ]);
        assert_eq!(config.groups, vec!["a", "b"]);
        assert!(!config.store_options().record_messages);
        let options = config.mqtt_options();
        assert_eq!(options.credentials, Some(("user".into(), String::new())));
    }
}
