use std::fmt;

use crate::omni::{Measurements, Payload};

/// One message as delivered by the broker, undecoded
#[derive(Debug, Clone)]
pub struct RawEnvelope {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl RawEnvelope {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        RawEnvelope {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Item passed from the receiver to the dispatcher
#[derive(Debug, Clone)]
pub enum QueueItem {
    Message(RawEnvelope),
    /// Sentinel: the dispatcher stops without reading further items
    Shutdown,
}

/// Device identity, `model/id/channel`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey(String);

impl DeviceKey {
    pub fn new(model: &str, id: &str, channel: &str) -> Self {
        DeviceKey(format!("{}/{}/{}", model, id, channel))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A device report that passed the ingress filter
#[derive(Debug, Clone)]
pub struct Reading {
    pub model: String,
    pub id: String,
    pub channel: String,
    pub time: String,
    /// Hex string as sent by rtl_433, checked after the event time
    pub payload: String,
}

impl Reading {
    pub fn device_key(&self) -> DeviceKey {
        DeviceKey::new(&self.model, &self.id, &self.channel)
    }
}

/// Display unit for temperatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

/// A decoded, non-duplicate reading ready for output
#[derive(Debug, Clone)]
pub struct DecodedSample {
    pub device_key: DeviceKey,
    /// Alias from the config, or the device key itself
    pub label: String,
    /// HH:MM:SS of the event time
    pub display_time: String,
    pub payload: Payload,
    pub measurements: Measurements,
}
