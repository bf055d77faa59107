// Remote control commands received over MQTT

use crate::config::MqttTopics;
use crate::device::{Restart, StatusLed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    Led(bool),
}

/// Map an inbound message to a command. Payloads are compared after
/// trimming surrounding whitespace; anything unrecognised yields `None`.
pub fn parse_command(topics: &MqttTopics, topic: &str, payload: &[u8]) -> Option<Command> {
    let payload = std::str::from_utf8(payload).ok()?.trim();

    if topic == topics.reset {
        (payload == "reset").then_some(Command::Reset)
    } else if topic == topics.led {
        match payload {
            "true" => Some(Command::Led(true)),
            "false" => Some(Command::Led(false)),
            _ => None,
        }
    } else {
        None
    }
}

pub fn apply_command<R, L>(command: Command, restart: &R, led: &mut L)
where
    R: Restart,
    L: StatusLed,
{
    match command {
        Command::Reset => {
            log::warn!("Reset requested over MQTT, restarting device");
            restart.restart();
        }
        Command::Led(on) => {
            log::info!("LED {}", if on { "on" } else { "off" });
            led.set(on);
        }
    }
}
