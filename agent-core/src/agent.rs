// Application context for the post-OTA main loop

use crate::commands::{apply_command, parse_command, Command};
use crate::config::{AgentConfig, MqttTopics};
use crate::device::{Restart, StatusLed};
use crate::telemetry::{publish_reading, publish_version, Broker, PublishSchedule, SensorSource};
use std::time::Instant;

/// Events forwarded from the MQTT connection thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Connected,
    Disconnected,
    Message { topic: String, payload: Vec<u8> },
}

/// Owns everything the periodic loop touches. Built once after the update
/// check and driven by the firmware's main loop.
pub struct Agent<B, S, L, R> {
    broker: B,
    sensors: S,
    led: L,
    restart: R,
    topics: MqttTopics,
    schedule: PublishSchedule,
    version: Option<u32>,
    connected: bool,
}

impl<B, S, L, R> Agent<B, S, L, R>
where
    B: Broker,
    S: SensorSource,
    L: StatusLed,
    R: Restart,
{
    pub fn new(
        config: &AgentConfig,
        version: Option<u32>,
        broker: B,
        sensors: S,
        led: L,
        restart: R,
        start: Instant,
    ) -> Self {
        Self {
            broker,
            sensors,
            led,
            restart,
            topics: config.mqtt.topics.clone(),
            schedule: PublishSchedule::new(config.publish_interval(), start),
            version,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// React to one event from the broker connection.
    ///
    /// On every (re)connect the command topics are subscribed again and the
    /// installed version is announced, if the record could be read.
    pub fn handle(&mut self, event: Inbound) -> Option<Command> {
        match event {
            Inbound::Connected => {
                self.connected = true;
                for topic in [&self.topics.reset, &self.topics.led] {
                    if let Err(e) = self.broker.subscribe(topic) {
                        log::warn!("Failed to subscribe to {}: {:?}", topic, e);
                    }
                }
                log::info!(
                    "Connected to MQTT broker and subscribed to topics: {} {}",
                    self.topics.reset,
                    self.topics.led
                );
                match self.version {
                    Some(version) => {
                        if let Err(e) = publish_version(&mut self.broker, &self.topics.version, version) {
                            log::warn!("Failed to publish version: {:?}", e);
                        }
                    }
                    None => log::warn!("Version record unavailable, not publishing version"),
                }
                None
            }
            Inbound::Disconnected => {
                log::warn!("MQTT broker disconnected");
                self.connected = false;
                None
            }
            Inbound::Message { topic, payload } => {
                log::debug!("MQTT message on {}: {}", topic, String::from_utf8_lossy(&payload));
                let command = parse_command(&self.topics, &topic, &payload);
                match command {
                    Some(command) => apply_command(command, &self.restart, &mut self.led),
                    None => log::debug!("Ignoring message on {}", topic),
                }
                command
            }
        }
    }

    /// Sample and publish if the interval has elapsed. Returns the number of
    /// values published.
    pub fn tick(&mut self, now: Instant) -> usize {
        if !self.schedule.is_due(now) {
            return 0;
        }
        if !self.connected {
            log::debug!("Skipping sensor publish, broker not connected");
            return 0;
        }
        let reading = self.sensors.sample();
        publish_reading(&mut self.broker, &self.topics, &reading)
    }
}
