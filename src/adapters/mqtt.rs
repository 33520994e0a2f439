use rumqttc::{AsyncClient, MqttOptions};
use std::time::Duration;

use crate::config::AppConfig;

pub struct MqttAdapter;

impl MqttAdapter {
    /// Build the client and event loop the ingest loop will drive.
    pub fn build(config: &AppConfig) -> (AsyncClient, rumqttc::EventLoop) {
        // Stable Client ID for Persistent Sessions (Avoids Zombies)
        let client_id = format!("{}_{}", config.mqtt_client_id_prefix, std::process::id());

        let mut mqttoptions = MqttOptions::new(client_id, &config.mqtt_host, config.mqtt_port);
        mqttoptions.set_keep_alive(Duration::from_secs(30));

        // Reliability settings for QoS 1
        mqttoptions.set_clean_session(false); // Persistent Session: Broker queues msgs while we restart
        mqttoptions.set_manual_acks(true); // Ack only after decode+store accounting

        AsyncClient::new(mqttoptions, 100)
    }
}
