use crate::domains::saves::endec::{CHECKSUM_LEN, STRING_VALUE_TYPE_INDICATOR, StoredDuration};
use bytes::Bytes;

pub mod snapshot_loader;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Snapshot {
    pub header: Header,
    pub metadata: Vec<Metadata>,
    pub databases: Vec<SubDatabase>,
    pub checksum: [u8; CHECKSUM_LEN],
}

impl Snapshot {
    pub fn into_entries(self) -> impl Iterator<Item = RawEntry> {
        self.databases.into_iter().flat_map(|section| section.entries)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    pub magic: String,
    pub version: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Metadata {
    pub name: String,
    pub value: String,
}

/// Resize hint written after `FB`; informational only.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TableSize {
    pub key_value: usize,
    pub expires: usize,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SubDatabase {
    pub index: usize,
    pub table_size: Option<TableSize>,
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawEntry {
    pub expiry: Option<StoredDuration>,
    pub value_type: u8,
    pub key: Bytes,
    pub value: Bytes,
}

impl RawEntry {
    pub fn string(
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        expiry: Option<StoredDuration>,
    ) -> Self {
        Self { expiry, value_type: STRING_VALUE_TYPE_INDICATOR, key: key.into(), value: value.into() }
    }
}
