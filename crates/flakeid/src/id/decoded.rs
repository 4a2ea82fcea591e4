use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::id::FlakeId;

/// The fields of a [`FlakeId`], with the timestamp made absolute.
///
/// Produced by [`decode`] or [`FlakeId::decode`]. This is a read-only view:
/// it cannot be turned back into an ID without the epoch it was decoded with.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodedId {
    timestamp: u64,
    timestamp_delta: u64,
    datacenter_id: u64,
    worker_id: u64,
    sequence: u64,
}

impl DecodedId {
    pub(crate) fn new(id: FlakeId, epoch: Duration) -> Self {
        let epoch_millis = u64::try_from(epoch.as_millis()).unwrap_or(u64::MAX);
        let timestamp_delta = id.timestamp();
        Self {
            timestamp: epoch_millis.saturating_add(timestamp_delta),
            timestamp_delta,
            datacenter_id: id.datacenter_id(),
            worker_id: id.worker_id(),
            sequence: id.sequence(),
        }
    }

    /// Absolute generation time in milliseconds since the Unix epoch.
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Milliseconds between the epoch and the generation time, as stored in
    /// the ID.
    pub const fn timestamp_delta(&self) -> u64 {
        self.timestamp_delta
    }

    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Generation time as a [`SystemTime`].
    pub fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.timestamp)
    }
}

/// Decodes a raw ID produced with `epoch`.
///
/// Pure and lock-free. The input is treated as an unsigned bit pattern, so
/// both `u64` and `i64` representations are accepted.
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use flakeid::{FlakeId, decode};
///
/// let epoch = Duration::from_millis(1_288_834_974_657);
/// let raw: i64 = FlakeId::from_parts(1000, 1, 4, 0).to_i64();
///
/// let parts = decode(raw, epoch);
/// assert_eq!(parts.timestamp_delta(), 1000);
/// assert_eq!(parts.timestamp(), 1_288_834_975_657);
/// assert_eq!(parts.datacenter_id(), 1);
/// assert_eq!(parts.worker_id(), 4);
/// assert_eq!(parts.sequence(), 0);
/// ```
pub fn decode(id: impl Into<FlakeId>, epoch: Duration) -> DecodedId {
    id.into().decode(epoch)
}
