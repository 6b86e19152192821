pub mod decoder;
pub mod dedup;

pub use decoder::{decode, sign_extend, Measurements, Payload};
pub use dedup::Deduplicator;
