pub mod connection;
pub mod receiver;

pub use connection::{connect, mqtt_options};
pub use receiver::{forward_publish, run_receiver};
