use core::time::Duration;

use crate::{
    error::{Error, Result},
    id::FlakeId,
    time::DEFAULT_EPOCH,
};

/// Identity and epoch of one ID-generating node.
///
/// A node is a `(datacenter_id, worker_id)` pair. Every generator is built
/// from a validated `NodeConfig`, so an out-of-range identifier can never
/// reach the bit packing. The datacenter and worker fields are pre-shifted
/// once here and OR-ed into every ID the node issues.
///
/// # Example
///
/// ```
/// use flakeid::{Error, NodeConfig};
///
/// let node = NodeConfig::new(1, 4).unwrap();
/// assert_eq!(node.datacenter_id(), 1);
/// assert_eq!(node.worker_id(), 4);
///
/// assert!(matches!(
///     NodeConfig::new(32, 0),
///     Err(Error::InvalidConfiguration { field: "datacenter_id", value: 32, max: 31 })
/// ));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeConfig {
    datacenter_id: u64,
    worker_id: u64,
    epoch: Duration,
    epoch_millis: u64,
    node_bits: u64,
}

impl NodeConfig {
    /// Largest accepted datacenter ID.
    pub const MAX_DATACENTER_ID: u64 = FlakeId::DATACENTER_ID_MASK;

    /// Largest accepted worker ID.
    pub const MAX_WORKER_ID: u64 = FlakeId::WORKER_ID_MASK;

    /// Creates a node using [`DEFAULT_EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if either ID is outside
    /// `0..=31`.
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        Self::with_epoch(datacenter_id, worker_id, DEFAULT_EPOCH)
    }

    /// Creates a node whose timestamps count from `epoch` (time since the Unix
    /// epoch).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if either ID is outside
    /// `0..=31`.
    pub fn with_epoch(datacenter_id: u64, worker_id: u64, epoch: Duration) -> Result<Self> {
        if datacenter_id > Self::MAX_DATACENTER_ID {
            return Err(Error::InvalidConfiguration {
                field: "datacenter_id",
                value: datacenter_id,
                max: Self::MAX_DATACENTER_ID,
            });
        }
        if worker_id > Self::MAX_WORKER_ID {
            return Err(Error::InvalidConfiguration {
                field: "worker_id",
                value: worker_id,
                max: Self::MAX_WORKER_ID,
            });
        }

        Ok(Self {
            datacenter_id,
            worker_id,
            epoch,
            epoch_millis: u64::try_from(epoch.as_millis()).unwrap_or(u64::MAX),
            node_bits: (datacenter_id << FlakeId::DATACENTER_ID_SHIFT)
                | (worker_id << FlakeId::WORKER_ID_SHIFT),
        })
    }

    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// The epoch as time since the Unix epoch.
    pub const fn epoch(&self) -> Duration {
        self.epoch
    }

    /// The epoch in milliseconds since the Unix epoch.
    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }

    /// Milliseconds between the epoch and `unix_millis`. A clock reading
    /// before the epoch saturates to zero.
    pub const fn elapsed(&self, unix_millis: u64) -> u64 {
        unix_millis.saturating_sub(self.epoch_millis)
    }

    /// Packs a timestamp delta and sequence with this node's identity.
    pub const fn pack(&self, timestamp: u64, sequence: u64) -> FlakeId {
        FlakeId::from_raw(
            ((timestamp & FlakeId::TIMESTAMP_MASK) << FlakeId::TIMESTAMP_SHIFT)
                | self.node_bits
                | (sequence & FlakeId::SEQUENCE_MASK),
        )
    }

    /// State a fresh generator starts from: timestamp zero with the sequence
    /// exhausted, so the first ID is issued strictly after the epoch with
    /// sequence zero.
    pub(crate) const fn initial_state(&self) -> FlakeId {
        self.pack(0, FlakeId::SEQUENCE_MASK)
    }
}
