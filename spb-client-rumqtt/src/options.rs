use std::time::Duration;

use rumqttc::v5::{mqttbytes::v5::ConnectProperties, MqttOptions as RuMqttOptions};

/// Connection options for the rumqttc backed client.
pub struct MqttOptions {
    pub broker_addr: String,
    pub port: u16,
    pub client_id: String,
    pub credentials: Option<(String, String)>,
    pub keep_alive: Duration,
}

impl MqttOptions {
    pub fn new<S: Into<String>, S1: Into<String>>(client_id: S, addr: S1, port: u16) -> Self {
        Self {
            broker_addr: addr.into(),
            port,
            client_id: client_id.into(),
            credentials: None,
            keep_alive: Duration::from_secs(30),
        }
    }

    pub fn set_credentials<S: Into<String>, S1: Into<String>>(
        &mut self,
        username: S,
        password: S1,
    ) -> &mut Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn set_keep_alive(&mut self, keep_alive: Duration) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }
}

impl From<MqttOptions> for RuMqttOptions {
    fn from(value: MqttOptions) -> Self {
        let mut options = RuMqttOptions::new(value.client_id, value.broker_addr, value.port);
        options.set_keep_alive(value.keep_alive);
        if let Some((username, password)) = value.credentials {
            options.set_credentials(username, password);
        }

        let mut connection_properties = options
            .connect_properties()
            .unwrap_or_else(ConnectProperties::new);
        /* Sparkplug requires session expiry interval to be 0 */
        connection_properties.session_expiry_interval = Some(0);
        options
            .set_clean_start(true)
            .set_connect_properties(connection_properties);
        options
    }
}
