// Sensor sampling and broker publishing

use crate::config::MqttTopics;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
}

pub trait SensorSource {
    fn sample(&mut self) -> SensorReading;
}

/// Publish/subscribe session on the MQTT broker.
pub trait Broker {
    type Error: fmt::Debug;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;
}

impl<T: Broker + ?Sized> Broker for &mut T {
    type Error = T::Error;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        (**self).publish(topic, payload)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        (**self).subscribe(topic)
    }
}

/// Fixed-interval trigger, measured from construction.
#[derive(Debug, Clone)]
pub struct PublishSchedule {
    interval: Duration,
    last: Instant,
}

impl PublishSchedule {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    /// True at most once per interval; re-arms from `now` when it fires.
    pub fn is_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Publish every present value of `reading`; returns how many went out.
pub fn publish_reading<B: Broker>(
    broker: &mut B,
    topics: &MqttTopics,
    reading: &SensorReading,
) -> usize {
    let values = [
        (&topics.temperature, reading.temperature_c),
        (&topics.humidity, reading.humidity_pct),
    ];

    let mut published = 0;
    for (topic, value) in values {
        let Some(value) = value else { continue };
        let payload = format!("{:.1}", value);
        match broker.publish(topic, payload.as_bytes()) {
            Ok(()) => {
                log::info!("Published {} to {}", payload, topic);
                published += 1;
            }
            Err(e) => log::warn!("Failed to publish to {}: {:?}", topic, e),
        }
    }
    published
}

pub fn publish_version<B: Broker>(broker: &mut B, topic: &str, version: u32) -> Result<(), B::Error> {
    broker.publish(topic, version.to_string().as_bytes())?;
    log::info!("Published version: {} to {}", version, topic);
    Ok(())
}
