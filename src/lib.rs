//! Omni multisensor monitor
//!
//! Subscribes to the rtl_433 MQTT event feed, picks out Omni multisensor
//! reports, drops retransmissions and prints the decoded measurements.
//!
//! Architecture: MQTT event loop → queue → dispatcher → stdout

pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod mqtt;
pub mod omni;
pub mod shutdown;
pub mod utils;

pub use error::{Error, Result};
