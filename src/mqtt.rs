use agent_core::config::MqttConfig;
use agent_core::telemetry::Broker;
use agent_core::Inbound;
use anyhow::Result;
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use esp_idf_svc::sys::EspError;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// Publishing half of the broker connection. Events arrive separately on the
/// receiver returned by [`connect`].
pub struct MqttSession {
    client: EspMqttClient<'static>,
}

impl Broker for MqttSession {
    type Error = EspError;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), EspError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .map(|_| ())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), EspError> {
        self.client.subscribe(topic, QoS::AtLeastOnce).map(|_| ())
    }
}

/// Start the client and a poll thread that forwards connection events to the
/// main loop.
pub fn connect(config: &MqttConfig) -> Result<(MqttSession, Receiver<Inbound>)> {
    let conf = MqttClientConfiguration {
        client_id: Some(config.client_id.as_str()),
        ..Default::default()
    };

    let (client, conn) = EspMqttClient::new(&config.broker_url, &conf)?;
    log::info!("MQTT client started for {}", config.broker_url);

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("mqtt-poll".to_string())
        .stack_size(8192)
        .spawn(move || poll_events(conn, tx))?;

    Ok((MqttSession { client }, rx))
}

fn poll_events(mut conn: EspMqttConnection, tx: Sender<Inbound>) {
    loop {
        let inbound = match conn.next() {
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => Some(Inbound::Connected),
                EventPayload::Disconnected => Some(Inbound::Disconnected),
                EventPayload::Received { topic, data, .. } => topic.map(|topic| Inbound::Message {
                    topic: topic.to_string(),
                    payload: data.to_vec(),
                }),
                _ => None,
            },
            Err(err) => {
                log::warn!("MQTT poll error: {:?}", err);
                thread::sleep(Duration::from_secs(2));
                None
            }
        };

        if let Some(inbound) = inbound {
            if tx.send(inbound).is_err() {
                log::warn!("MQTT event receiver dropped, stopping poll thread");
                return;
            }
        }
    }
}
