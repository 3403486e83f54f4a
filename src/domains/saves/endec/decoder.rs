use crate::domains::saves::endec::{
    CHECKSUM_INDICATOR, CHECKSUM_LEN, DATABASE_SECTION_INDICATOR, DATABASE_TABLE_SIZE_INDICATOR,
    DecodeError, EXPIRY_TIME_IN_MILLISECONDS_INDICATOR, EXPIRY_TIME_IN_SECONDS_INDICATOR,
    HEADER_MAGIC_STRING, METADATA_SECTION_INDICATOR, STRING_VALUE_TYPE_INDICATOR, StoredDuration,
    VERSION_LEN, extract_range,
};
use crate::domains::saves::snapshot::{Header, Metadata, RawEntry, Snapshot, SubDatabase, TableSize};
use bytes::Bytes;
use std::ops::Deref;
use tracing::warn;

/// Walks a snapshot byte slice front to back. `offset` is the absolute position of `data[0]`.
pub struct BytesDecoder<'a, T> {
    pub data: &'a [u8],
    pub offset: usize,
    pub state: T,
}

#[derive(Debug, PartialEq, Eq)]
enum SizeEncoding {
    Length(usize),
    Special(u8),
}

#[derive(Default)]
pub(crate) struct DatabaseSectionBuilder {
    pub(crate) index: usize,
    pub(crate) table_size: Option<TableSize>,
    pub(crate) entries: Vec<RawEntry>,
}

impl DatabaseSectionBuilder {
    pub fn build(self) -> SubDatabase {
        SubDatabase { index: self.index, table_size: self.table_size, entries: self.entries }
    }
}

/// General purpose BytesDecoder implementation
impl<'a, T> BytesDecoder<'a, T> {
    fn skip(&mut self, n: usize) {
        self.data = &self.data[n..];
        self.offset += n;
    }

    /// Takes `n` bytes, or fails with an error pointing at `item_start`.
    fn take(&mut self, n: usize, item_start: usize, what: &str) -> Result<&'a [u8], DecodeError> {
        if self.len() < n {
            return Err(DecodeError::malformed(
                item_start,
                format!("truncated {what}: need {n} bytes, {} left", self.len()),
            ));
        }
        let data: &'a [u8] = self.data;
        self.skip(n);
        let taken = &data[..n];
        Ok(taken)
    }

    pub fn remove_identifier(&mut self) {
        self.skip(1);
    }

    pub(crate) fn check_indicator(&self, iden: u8) -> bool {
        self.first() == Some(&iden)
    }

    fn read_size_encoding(&mut self) -> Result<SizeEncoding, DecodeError> {
        let start = self.offset;
        let first_byte = self.take(1, start, "size prefix")?[0];

        let encoding = match first_byte >> 6 {
            | 0b00 => SizeEncoding::Length((first_byte & 0x3F) as usize),
            | 0b01 => {
                let next = self.take(1, start, "14-bit size")?[0];
                SizeEncoding::Length((((first_byte & 0x3F) as usize) << 8) | next as usize)
            },
            | 0b10 => {
                let bytes = self.take(4, start, "32-bit size")?;
                let size = extract_range::<4>(bytes, 0..=3)
                    .map(u32::from_be_bytes)
                    .ok_or_else(|| DecodeError::malformed(start, "32-bit size"))?;
                SizeEncoding::Length(size as usize)
            },
            | _ => SizeEncoding::Special(first_byte & 0x3F),
        };
        Ok(encoding)
    }

    pub fn size_decode(&mut self) -> Result<usize, DecodeError> {
        let start = self.offset;
        match self.read_size_encoding()? {
            | SizeEncoding::Length(size) => Ok(size),
            | SizeEncoding::Special(_) => Err(DecodeError::malformed(
                start,
                "special string encoding where a plain size was expected",
            )),
        }
    }

    // A length-prefixed string, or an integer stored in one of the special encodings.
    // The bytes are kept as they are; keys and values need not be UTF-8.
    pub fn string_decode(&mut self) -> Result<Bytes, DecodeError> {
        let start = self.offset;
        match self.read_size_encoding()? {
            | SizeEncoding::Length(size) => {
                Ok(Bytes::copy_from_slice(self.take(size, start, "string")?))
            },
            | SizeEncoding::Special(encoding) => Ok(self.integer_decode(start, encoding)?.into()),
        }
    }

    // Auxiliary fields are informational, so they are read as text.
    fn text_decode(&mut self) -> Result<String, DecodeError> {
        Ok(String::from_utf8_lossy(&self.string_decode()?).into_owned())
    }

    fn integer_decode(&mut self, start: usize, encoding: u8) -> Result<String, DecodeError> {
        let value = match encoding {
            | 0 => (self.take(1, start, "8-bit integer")?[0] as i8).to_string(),
            | 1 => {
                let bytes = self.take(2, start, "16-bit integer")?;
                u16::from_le_bytes([bytes[0], bytes[1]]).to_string()
            },
            | 2 => {
                let bytes = self.take(4, start, "32-bit integer")?;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).to_string()
            },
            | 3 => {
                return Err(DecodeError::UnsupportedEncoding {
                    offset: start,
                    cause: "LZF-compressed string".into(),
                });
            },
            | other => {
                return Err(DecodeError::UnsupportedEncoding {
                    offset: start,
                    cause: format!("special string encoding {other}"),
                });
            },
        };
        Ok(value)
    }
}

impl<'a> BytesDecoder<'a, DecoderInit> {
    // 5 magic bytes followed by a 4 byte version, e.g. "REDIS0011"
    pub fn load_header(mut self) -> Result<BytesDecoder<'a, HeaderReady>, DecodeError> {
        let header_len = HEADER_MAGIC_STRING.len() + VERSION_LEN;
        if self.len() < header_len {
            return Err(DecodeError::malformed(
                self.offset,
                format!("header needs {header_len} bytes, found {}", self.len()),
            ));
        }

        let start = self.offset;
        let magic = String::from_utf8_lossy(self.take(HEADER_MAGIC_STRING.len(), start, "magic")?)
            .into_owned();
        if magic != HEADER_MAGIC_STRING {
            warn!(%magic, "snapshot does not start with {HEADER_MAGIC_STRING}");
        }
        let version =
            String::from_utf8_lossy(self.take(VERSION_LEN, start, "version")?).into_owned();

        Ok(BytesDecoder {
            data: self.data,
            offset: self.offset,
            state: HeaderReady(Header { magic, version }),
        })
    }
}

impl<'a> BytesDecoder<'a, HeaderReady> {
    pub fn load_metadata(mut self) -> Result<BytesDecoder<'a, MetadataReady>, DecodeError> {
        let mut metadata = Vec::new();
        while self.check_indicator(METADATA_SECTION_INDICATOR) {
            metadata.push(self.try_extract_metadata_key_value()?);
        }

        Ok(BytesDecoder {
            data: self.data,
            offset: self.offset,
            state: MetadataReady { header: self.state.0, metadata },
        })
    }

    fn try_extract_metadata_key_value(&mut self) -> Result<Metadata, DecodeError> {
        self.remove_identifier();
        let name = self.text_decode()?;
        let value = self.text_decode()?;
        Ok(Metadata { name, value })
    }
}

impl BytesDecoder<'_, MetadataReady> {
    pub fn load_database(mut self) -> Result<Snapshot, DecodeError> {
        let mut databases = Vec::new();
        loop {
            match self.first().copied() {
                | Some(DATABASE_SECTION_INDICATOR) => databases.push(self.extract_section()?),
                | Some(CHECKSUM_INDICATOR) => break,
                | Some(other) => {
                    return Err(DecodeError::malformed(
                        self.offset,
                        format!("unexpected section marker 0x{other:02X}"),
                    ));
                },
                | None => {
                    return Err(DecodeError::malformed(self.offset, "missing end-of-file marker"));
                },
            }
        }

        let checksum = self.try_get_checksum()?;
        let MetadataReady { header, metadata } = self.state;
        Ok(Snapshot { header, metadata, databases, checksum })
    }

    // Entries run until the next database marker or the end-of-file marker.
    fn extract_section(&mut self) -> Result<SubDatabase, DecodeError> {
        let mut builder = DatabaseSectionBuilder::default();
        self.remove_identifier();
        builder.index = self.size_decode()?;

        if self.check_indicator(DATABASE_TABLE_SIZE_INDICATOR) {
            self.remove_identifier();
            builder.table_size =
                Some(TableSize { key_value: self.size_decode()?, expires: self.size_decode()? });
        }

        while let Some(&identifier) = self.first() {
            if identifier == DATABASE_SECTION_INDICATOR || identifier == CHECKSUM_INDICATOR {
                break;
            }
            builder.entries.push(self.try_key_value()?);
        }

        Ok(builder.build())
    }

    pub fn try_key_value(&mut self) -> Result<RawEntry, DecodeError> {
        let expiry = match self.first().copied() {
            | Some(EXPIRY_TIME_IN_MILLISECONDS_INDICATOR) => {
                Some(self.try_extract_expiry_time_in_milliseconds()?)
            },
            | Some(EXPIRY_TIME_IN_SECONDS_INDICATOR) => {
                Some(self.try_extract_expiry_time_in_seconds()?)
            },
            | _ => None,
        };

        let type_offset = self.offset;
        let value_type = self.take(1, type_offset, "value type")?[0];
        if value_type != STRING_VALUE_TYPE_INDICATOR {
            return Err(DecodeError::UnsupportedValueType { offset: type_offset, value_type });
        }

        let key = self.string_decode()?;
        let value = self.string_decode()?;
        Ok(RawEntry { expiry, value_type, key, value })
    }

    fn try_extract_expiry_time_in_seconds(&mut self) -> Result<StoredDuration, DecodeError> {
        self.remove_identifier();
        let start = self.offset;
        let bytes = self.take(4, start, "expiry seconds")?;
        Ok(StoredDuration::Seconds(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
    }

    fn try_extract_expiry_time_in_milliseconds(&mut self) -> Result<StoredDuration, DecodeError> {
        self.remove_identifier();
        let start = self.offset;
        let bytes = self.take(8, start, "expiry milliseconds")?;
        let millis = extract_range::<8>(bytes, 0..=7)
            .map(u64::from_le_bytes)
            .ok_or_else(|| DecodeError::malformed(start, "expiry milliseconds"))?;
        Ok(StoredDuration::Milliseconds(millis))
    }

    // Captured as-is, never verified.
    fn try_get_checksum(&mut self) -> Result<[u8; CHECKSUM_LEN], DecodeError> {
        self.remove_identifier();
        let start = self.offset;
        let bytes = self.take(CHECKSUM_LEN, start, "checksum")?;
        extract_range::<CHECKSUM_LEN>(bytes, 0..=CHECKSUM_LEN - 1)
            .ok_or_else(|| DecodeError::malformed(start, "checksum"))
    }
}

pub struct DecoderInit;

#[derive(PartialEq, Eq, Debug)]
pub struct HeaderReady(pub(crate) Header);

pub struct MetadataReady {
    pub(crate) header: Header,
    pub(crate) metadata: Vec<Metadata>,
}

impl<'a> From<&'a [u8]> for BytesDecoder<'a, DecoderInit> {
    fn from(data: &'a [u8]) -> Self {
        Self { data, offset: 0, state: DecoderInit }
    }
}

impl<'a, T> Deref for BytesDecoder<'a, T> {
    type Target = &'a [u8];
    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
