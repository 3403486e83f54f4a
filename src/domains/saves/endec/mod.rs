//! Snapshot file grammar.
//!
//! ```text
//! header      "REDIS" + 4-byte version
//! metadata*   FA <string name> <string value>
//! database*   FE <size index> [FB <size keys> <size expires>] entry*
//! entry       [FC <u64 LE millis> | FD <u32 LE secs>] <type byte> <string key> <string value>
//! trailer     FF <8-byte checksum>
//! ```
//!
//! # Size Encoding Format
//!
//! The top two bits of the first byte select the form:
//!
//! * `00xxxxxx`: the remaining 6 bits are the length (0-63).
//! * `01xxxxxx yyyyyyyy`: 14-bit big-endian length.
//! * `10______` + 4 bytes: 32-bit big-endian length, low bits of the first byte unused.
//! * `11xxxxxx`: special string encoding selected by the low 6 bits. `0` is an `i8`,
//!   `1` a little-endian `u16`, `2` a little-endian `u32` (all rendered as decimal text),
//!   `3` an LZF-compressed string, which is not supported.
use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;
use thiserror::Error;

pub mod decoder;

pub(crate) const HEADER_MAGIC_STRING: &str = "REDIS";
pub(crate) const VERSION_LEN: usize = 4;
pub(crate) const METADATA_SECTION_INDICATOR: u8 = 0xFA;
pub(crate) const DATABASE_SECTION_INDICATOR: u8 = 0xFE;
pub(crate) const DATABASE_TABLE_SIZE_INDICATOR: u8 = 0xFB;
pub(crate) const EXPIRY_TIME_IN_MILLISECONDS_INDICATOR: u8 = 0xFC;
pub(crate) const EXPIRY_TIME_IN_SECONDS_INDICATOR: u8 = 0xFD;
pub(crate) const STRING_VALUE_TYPE_INDICATOR: u8 = 0x00;
pub(crate) const CHECKSUM_INDICATOR: u8 = 0xFF;
pub(crate) const CHECKSUM_LEN: usize = 8;

// Safe conversion from a slice to an array of a specific size.
pub(crate) fn extract_range<const N: usize>(
    encoded: &[u8],
    range: RangeInclusive<usize>,
) -> Option<[u8; N]> {
    TryInto::<[u8; N]>::try_into(encoded.get(range)?).ok()
}

/// Absolute expiry timestamp as stored in the file.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StoredDuration {
    Seconds(u32),
    Milliseconds(u64),
}

impl StoredDuration {
    pub fn as_millis(&self) -> u64 {
        match self {
            | StoredDuration::Seconds(secs) => *secs as u64 * 1000,
            | StoredDuration::Milliseconds(millis) => *millis,
        }
    }

    /// None when the timestamp lies beyond what chrono can represent.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let millis = i64::try_from(self.as_millis()).ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("malformed snapshot at offset {offset}: {cause}")]
    Malformed { offset: usize, cause: String },
    #[error("unsupported encoding at offset {offset}: {cause}")]
    UnsupportedEncoding { offset: usize, cause: String },
    #[error("unsupported value type 0x{value_type:02X} at offset {offset}")]
    UnsupportedValueType { offset: usize, value_type: u8 },
}

impl DecodeError {
    pub(crate) fn malformed(offset: usize, cause: impl Into<String>) -> Self {
        DecodeError::Malformed { offset, cause: cause.into() }
    }

    pub fn offset(&self) -> usize {
        match self {
            | DecodeError::Malformed { offset, .. }
            | DecodeError::UnsupportedEncoding { offset, .. }
            | DecodeError::UnsupportedValueType { offset, .. } => *offset,
        }
    }
}
