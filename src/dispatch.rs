/// Ingress filtering and dispatch of rtl_433 records
///
/// Runs as the single consumer of the receiver queue: filter the JSON
/// record, drop retransmissions, decode the payload and write one line
/// per reading to the sink. Everything happens in queue order.
use std::io::Write;

use log::{debug, info, warn};
use serde_json::Value;
use time::UtcOffset;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::Aliases;
use crate::error::Result;
use crate::models::{DecodedSample, QueueItem, RawEnvelope, Reading, TemperatureUnit};
use crate::omni::{decode, Deduplicator, Payload};
use crate::shutdown::Shutdown;
use crate::utils::{format_sample, parse_event_time};

/// rtl_433 model name of the Omni multisensor
pub const TARGET_MODEL: &str = "Omni Multisensor";
/// Only channel 0 carries the format-1 data layout
pub const TARGET_CHANNEL: &str = "0";

/// Result of running a JSON record through the filter
#[derive(Debug)]
pub enum Filtered {
    Accepted(Reading),
    Rejected(&'static str),
}

/// What happened to one envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Emitted,
    Duplicate,
    Rejected(&'static str),
    Malformed,
}

/// Counters reported when the dispatcher stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub emitted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub malformed: u64,
}

/// rtl_433 writes ids and channels as JSON numbers for most devices
fn field_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Check a record against the target device and pull out its fields.
///
/// Returns `Err` when the body is not JSON; records for other devices
/// are `Filtered::Rejected`. The payload string is not checked here.
pub fn filter_record(body: &[u8]) -> Result<Filtered> {
    let record: Value = serde_json::from_slice(body)?;

    // Tire pressure sensors also report temperatures
    if record.get("type").and_then(Value::as_str) == Some("TPMS") {
        return Ok(Filtered::Rejected("TPMS report"));
    }

    let model = match record.get("model").and_then(Value::as_str) {
        Some(model) => model,
        None => return Ok(Filtered::Rejected("no model field")),
    };
    if model != TARGET_MODEL {
        return Ok(Filtered::Rejected("other model"));
    }

    let channel = match record.get("channel").and_then(field_to_string) {
        Some(channel) => channel,
        None => return Ok(Filtered::Rejected("no channel field")),
    };
    if channel != TARGET_CHANNEL {
        return Ok(Filtered::Rejected("other channel"));
    }

    let id = match record.get("id").and_then(field_to_string) {
        Some(id) => id,
        None => return Ok(Filtered::Rejected("no id field")),
    };
    let time = match record.get("time").and_then(field_to_string) {
        Some(time) => time,
        None => return Ok(Filtered::Rejected("no time field")),
    };
    let payload = match record.get("payload").and_then(Value::as_str) {
        Some(payload) => payload.to_string(),
        None => return Ok(Filtered::Rejected("no payload field")),
    };

    Ok(Filtered::Accepted(Reading {
        model: model.to_string(),
        id,
        channel,
        time,
        payload,
    }))
}

pub struct Dispatcher<W: Write> {
    dedup: Deduplicator,
    aliases: Aliases,
    unit: TemperatureUnit,
    local_offset: UtcOffset,
    sink: W,
    stats: DispatchStats,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(aliases: Aliases, unit: TemperatureUnit, sink: W) -> Self {
        Dispatcher {
            dedup: Deduplicator::new(),
            aliases,
            unit,
            local_offset: UtcOffset::UTC,
            sink,
            stats: DispatchStats::default(),
        }
    }

    /// Offset used to display epoch event times, UTC unless set
    pub fn with_local_offset(mut self, offset: UtcOffset) -> Self {
        self.local_offset = offset;
        self
    }

    /// Process one envelope.
    ///
    /// Bad JSON and bad payloads are logged and skipped. An unparseable
    /// event time or a failing sink is returned as an error, which ends
    /// the dispatch loop. The event time is checked before the payload,
    /// and both before dedup state is touched.
    pub fn handle(&mut self, envelope: &RawEnvelope) -> Result<Outcome> {
        self.stats.received += 1;

        let reading = match filter_record(&envelope.payload) {
            Ok(Filtered::Accepted(reading)) => reading,
            Ok(Filtered::Rejected(reason)) => {
                debug!("Skipping record on {}: {}", envelope.topic, reason);
                self.stats.rejected += 1;
                return Ok(Outcome::Rejected(reason));
            }
            Err(e) => {
                warn!(
                    "Unable to load record on {}: {}: {}",
                    envelope.topic,
                    e,
                    String::from_utf8_lossy(&envelope.payload)
                );
                self.stats.malformed += 1;
                return Ok(Outcome::Malformed);
            }
        };

        let key = reading.device_key();
        let event_time = parse_event_time(&reading.time, self.local_offset)?;

        let payload = match Payload::from_hex(&reading.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Bad payload from {}: {}: {}", key, e, reading.payload);
                self.stats.malformed += 1;
                return Ok(Outcome::Malformed);
            }
        };

        if !self.dedup.should_emit(&key, event_time.epoch) {
            debug!("Duplicate report from {} at {}", key, event_time.display);
            self.stats.duplicates += 1;
            return Ok(Outcome::Duplicate);
        }

        let sample = DecodedSample {
            label: self.aliases.resolve(&key),
            device_key: key,
            display_time: event_time.display,
            payload,
            measurements: decode(&payload),
        };

        writeln!(self.sink, "{}", format_sample(&sample, self.unit))?;
        self.sink.flush()?;
        self.stats.emitted += 1;

        Ok(Outcome::Emitted)
    }

    /// Consume the queue in order until the sentinel arrives, the queue
    /// closes, or shutdown has been requested.
    pub async fn run(
        &mut self,
        queue: &mut UnboundedReceiver<QueueItem>,
        shutdown: &Shutdown,
    ) -> Result<()> {
        info!("Dispatcher started");

        while !shutdown.is_triggered() {
            match queue.recv().await {
                Some(QueueItem::Message(envelope)) => {
                    self.handle(&envelope)?;
                }
                Some(QueueItem::Shutdown) | None => break,
            }
        }

        let s = self.stats;
        info!(
            "Dispatcher stopped: {} received, {} printed, {} duplicates, {} skipped, {} malformed",
            s.received, s.emitted, s.duplicates, s.rejected, s.malformed
        );
        Ok(())
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}
