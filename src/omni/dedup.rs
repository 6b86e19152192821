/// Duplicate suppression for retransmitted Omni packets
///
/// The sensor sends each reading several times in a burst, and rtl_433
/// may report more than one of them. Only the last accepted device and
/// time are remembered: reports from A, B, A inside the window are all
/// accepted.
use crate::models::DeviceKey;

/// Minimum spacing in seconds between accepted reports from one device
pub const DUP_THRESHOLD_SECS: f64 = 2.0;

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    last_key: Option<DeviceKey>,
    last_epoch: f64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `key` repeats the last accepted device within
    /// the threshold. On true the device and time are recorded.
    pub fn should_emit(&mut self, key: &DeviceKey, event_epoch: f64) -> bool {
        let same_device = self.last_key.as_ref() == Some(key);
        if same_device && event_epoch < self.last_epoch + DUP_THRESHOLD_SECS {
            return false;
        }

        self.last_key = Some(key.clone());
        self.last_epoch = event_epoch;
        true
    }

    pub fn last_key(&self) -> Option<&DeviceKey> {
        self.last_key.as_ref()
    }
}
