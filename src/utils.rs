/// Utility functions for time handling and output formatting
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::{Error, Result};
use crate::models::{DecodedSample, TemperatureUnit};

/// Event time of a reading in both display and numeric form
#[derive(Debug, Clone, PartialEq)]
pub struct EventTime {
    /// HH:MM:SS
    pub display: String,
    /// Seconds since the Unix epoch
    pub epoch: f64,
}

/// Parse the `time` field of an rtl_433 record.
///
/// rtl_433 emits either a local ISO-style timestamp such as
/// `2025-06-01 14:03:27` (optionally with a `+0200` style offset) or,
/// with `-M time:unix`, epoch seconds.
/// A string with a `-` after its first character takes the ISO path;
/// everything else must be a number. Naive timestamps are taken as UTC
/// and displayed as written; epoch times are displayed at `local`.
pub fn parse_event_time(ts: &str, local: UtcOffset) -> Result<EventTime> {
    let ts = ts.trim();
    let dt = if ts.find('-').map_or(false, |i| i > 0) {
        parse_iso(ts)?
    } else {
        parse_epoch(ts)?.to_offset(local)
    };

    Ok(EventTime {
        display: format_hms(&dt)?,
        epoch: dt.unix_timestamp_nanos() as f64 / 1e9,
    })
}

fn parse_iso(ts: &str) -> Result<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc3339) {
        return Ok(dt);
    }

    let with_offset = [
        format_description!(
            "[year]-[month]-[day] [hour]:[minute][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute][offset_hour sign:mandatory]:[offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ];
    if let Some(dt) = with_offset
        .iter()
        .find_map(|layout| OffsetDateTime::parse(ts, *layout).ok())
    {
        return Ok(dt);
    }

    let naive = [
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ];

    naive
        .iter()
        .find_map(|layout| PrimitiveDateTime::parse(ts, *layout).ok())
        .map(PrimitiveDateTime::assume_utc)
        .ok_or_else(|| Error::Timestamp(ts.to_string()))
}

fn parse_epoch(ts: &str) -> Result<OffsetDateTime> {
    let secs: f64 = ts.parse().map_err(|_| Error::Timestamp(ts.to_string()))?;
    if !secs.is_finite() {
        return Err(Error::Timestamp(ts.to_string()));
    }

    OffsetDateTime::from_unix_timestamp_nanos((secs * 1e9) as i128)
        .map_err(|_| Error::Timestamp(ts.to_string()))
}

/// Local UTC offset, falling back to UTC when it cannot be determined.
///
/// Must be called while the process is still single-threaded.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Format the time-of-day part as HH:MM:SS
pub fn format_hms(dt: &OffsetDateTime) -> Result<String> {
    dt.format(format_description!("[hour]:[minute]:[second]"))
        .map_err(|e| Error::Timestamp(e.to_string()))
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Render one output line for an accepted sample
pub fn format_sample(sample: &DecodedSample, unit: TemperatureUnit) -> String {
    let m = &sample.measurements;
    let (itemp, otemp) = match unit {
        TemperatureUnit::Celsius => (m.indoor_temp_c, m.outdoor_temp_c),
        TemperatureUnit::Fahrenheit => (
            celsius_to_fahrenheit(m.indoor_temp_c),
            celsius_to_fahrenheit(m.outdoor_temp_c),
        ),
    };
    let symbol = unit.symbol();

    format!(
        "{} {} payload={} itemp={:.1}{} otemp={:.1}{} ihum={}% light={}% \
         press={:.1} hPa volts={:.2}V",
        sample.display_time,
        sample.label,
        sample.payload.to_hex(),
        itemp,
        symbol,
        otemp,
        symbol,
        m.indoor_humidity_pct,
        m.light_pct,
        m.pressure_hpa,
        m.supply_volts,
    )
}
