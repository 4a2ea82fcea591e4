use core::{fmt, num::ParseIntError, str::FromStr, time::Duration};

use crate::id::DecodedId;

/// A 64-bit Snowflake ID with split datacenter and worker fields.
///
/// - 1 bit reserved (always zero, so the value is a non-negative `i64`)
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21            17 16        12 11             0
///              +--------------+----------------+----------------+------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter (5) | worker (5) | sequence (12) |
///              +--------------+----------------+----------------+------------+---------------+
///              |<---------------- MSB ------------ 64 bits ----------- LSB ----------------->|
/// ```
///
/// # Example
///
/// ```
/// use flakeid::FlakeId;
///
/// let id = FlakeId::from_parts(1000, 1, 4, 0);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.datacenter_id(), 1);
/// assert_eq!(id.worker_id(), 4);
/// assert_eq!(id.sequence(), 0);
/// assert_eq!(id.to_i64(), (1000 << 22) | (1 << 17) | (4 << 12));
/// ```
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FlakeId {
    id: u64,
}

impl FlakeId {
    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u64 = 12;

    /// Width of the worker ID field.
    pub const WORKER_ID_BITS: u64 = 5;

    /// Width of the datacenter ID field.
    pub const DATACENTER_ID_BITS: u64 = 5;

    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u64 = 41;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Bitmask for extracting the 5-bit worker ID field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << Self::WORKER_ID_BITS) - 1;

    /// Bitmask for extracting the 5-bit datacenter ID field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << Self::DATACENTER_ID_BITS) - 1;

    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Number of bits to shift the worker ID to its correct position (bit 12).
    pub const WORKER_ID_SHIFT: u64 = Self::SEQUENCE_BITS;

    /// Number of bits to shift the datacenter ID to its correct position (bit
    /// 17).
    pub const DATACENTER_ID_SHIFT: u64 = Self::SEQUENCE_BITS + Self::WORKER_ID_BITS;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 =
        Self::SEQUENCE_BITS + Self::WORKER_ID_BITS + Self::DATACENTER_ID_BITS;

    /// Mask covering the datacenter and worker fields in place.
    const NODE_MASK: u64 = (Self::DATACENTER_ID_MASK << Self::DATACENTER_ID_SHIFT)
        | (Self::WORKER_ID_MASK << Self::WORKER_ID_SHIFT);

    /// Packs the four fields into an ID. Each value is truncated to its field
    /// width.
    pub const fn from_parts(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id = (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Wraps a raw bit pattern without validation.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Reinterprets a signed value as a raw bit pattern.
    #[allow(clippy::cast_sign_loss)]
    pub const fn from_i64(raw: i64) -> Self {
        Self { id: raw as u64 }
    }

    /// Returns the raw bit pattern.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Returns the ID as a signed integer. Non-negative for every ID built by
    /// [`Self::from_parts`] or a generator.
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Extracts the timestamp delta (ms since epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID from the packed ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the maximum possible value for the timestamp field.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Returns the maximum possible value for the sequence field.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Returns true if the current sequence value can be incremented.
    pub const fn has_sequence_room(&self) -> bool {
        self.sequence() < Self::SEQUENCE_MASK
    }

    /// Returns a new ID with the sequence incremented.
    pub const fn increment_sequence(&self) -> Self {
        debug_assert!(self.has_sequence_room(), "sequence overflow");
        Self { id: self.id + 1 }
    }

    /// Returns a new ID for a newer timestamp with the node fields kept and
    /// the sequence reset to zero.
    pub const fn rollover_to_timestamp(&self, ts: u64) -> Self {
        debug_assert!(ts <= Self::TIMESTAMP_MASK, "timestamp overflow");
        Self {
            id: ((ts & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT) | (self.id & Self::NODE_MASK),
        }
    }

    /// Returns the same ID with the sequence saturated, so nothing more is
    /// issued for its timestamp.
    pub const fn exhaust_sequence(&self) -> Self {
        Self {
            id: self.id | Self::SEQUENCE_MASK,
        }
    }

    /// Splits the ID into its fields, reconstructing the absolute timestamp
    /// from `epoch` (time since the Unix epoch).
    ///
    /// The epoch must be the one the generator used; a different epoch yields
    /// a plausible but wrong timestamp.
    pub fn decode(&self, epoch: Duration) -> DecodedId {
        DecodedId::new(*self, epoch)
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<FlakeId> for u64 {
    fn from(id: FlakeId) -> Self {
        id.to_raw()
    }
}

impl From<FlakeId> for i64 {
    fn from(id: FlakeId) -> Self {
        id.to_i64()
    }
}

impl From<u64> for FlakeId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<i64> for FlakeId {
    fn from(raw: i64) -> Self {
        Self::from_i64(raw)
    }
}

impl FromStr for FlakeId {
    type Err = ParseIntError;

    /// Parses a decimal ID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self::from_raw)
    }
}

impl fmt::Display for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakeId")
            .field("raw", &format_args!("{:#018x}", self.id))
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_and_bounds() {
        let ts = FlakeId::max_timestamp();
        let dc = FlakeId::DATACENTER_ID_MASK;
        let wk = FlakeId::WORKER_ID_MASK;
        let seq = FlakeId::max_sequence();

        let id = FlakeId::from_parts(ts, dc, wk, seq);
        println!("ID: {id:?}");
        assert_eq!(id.timestamp(), ts);
        assert_eq!(id.datacenter_id(), dc);
        assert_eq!(id.worker_id(), wk);
        assert_eq!(id.sequence(), seq);
        assert_eq!(id.to_raw(), u64::MAX >> 1);
        assert_eq!(id.to_i64(), i64::MAX);
    }

    #[test]
    fn shifts_match_wire_layout() {
        assert_eq!(FlakeId::WORKER_ID_SHIFT, 12);
        assert_eq!(FlakeId::DATACENTER_ID_SHIFT, 17);
        assert_eq!(FlakeId::TIMESTAMP_SHIFT, 22);

        let id = FlakeId::from_parts(1, 1, 1, 1);
        assert_eq!(id.to_raw(), (1 << 22) | (1 << 17) | (1 << 12) | 1);
    }

    #[test]
    fn sign_bit_is_never_set_by_from_parts() {
        let id = FlakeId::from_parts(u64::MAX, u64::MAX, u64::MAX, u64::MAX);
        assert!(id.to_i64() >= 0);
        assert_eq!(id.to_raw() >> 63, 0);
    }

    #[test]
    fn node_fields_do_not_bleed() {
        let dc_only = FlakeId::from_parts(0, 31, 0, 0);
        let wk_only = FlakeId::from_parts(0, 0, 31, 0);
        assert_eq!(dc_only.worker_id(), 0);
        assert_eq!(wk_only.datacenter_id(), 0);
        assert_eq!(dc_only.sequence(), 0);
        assert_eq!(wk_only.sequence(), 0);
        assert_ne!(dc_only, wk_only);
    }

    #[test]
    fn rollover_keeps_node_and_resets_sequence() {
        let id = FlakeId::from_parts(10, 3, 7, 99);
        let next = id.rollover_to_timestamp(11);
        assert_eq!(next.timestamp(), 11);
        assert_eq!(next.datacenter_id(), 3);
        assert_eq!(next.worker_id(), 7);
        assert_eq!(next.sequence(), 0);
        assert!(next > id);
    }

    #[test]
    fn increment_and_exhaust_sequence() {
        let id = FlakeId::from_parts(10, 3, 7, 0);
        let next = id.increment_sequence();
        assert_eq!(next.sequence(), 1);
        assert_eq!(next.timestamp(), 10);

        let exhausted = next.exhaust_sequence();
        assert_eq!(exhausted.sequence(), FlakeId::max_sequence());
        assert_eq!(exhausted.timestamp(), 10);
        assert_eq!(exhausted.worker_id(), 7);
        assert!(!exhausted.has_sequence_room());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "sequence overflow")]
    fn increment_past_max_sequence_panics() {
        let id = FlakeId::from_parts(0, 0, 0, FlakeId::max_sequence());
        let _ = id.increment_sequence();
    }

    #[test]
    fn signed_and_unsigned_conversions_agree() {
        let id = FlakeId::from_parts(123_456, 2, 9, 17);
        assert_eq!(FlakeId::from(i64::from(id)), id);
        assert_eq!(FlakeId::from(u64::from(id)), id);
        assert_eq!(id.to_string().parse::<FlakeId>(), Ok(id));
        assert!("not-an-id".parse::<FlakeId>().is_err());
    }

    #[test]
    fn padded_string_is_twenty_digits() {
        let id = FlakeId::from_parts(0, 0, 0, 42);
        assert_eq!(id.to_padded_string(), "00000000000000000042");
    }

    #[test]
    fn debug_shows_fields() {
        let id = FlakeId::from_parts(1000, 1, 4, 0);
        assert_eq!(
            format!("{id:?}"),
            "FlakeId { raw: 0x00000000fa024000, timestamp: 1000, datacenter_id: 1, worker_id: 4, sequence: 0 }"
        );
    }
}
