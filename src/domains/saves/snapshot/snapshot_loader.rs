use super::Snapshot;
use crate::domains::saves::endec::DecodeError;
use crate::domains::saves::endec::decoder::{BytesDecoder, DecoderInit};
use anyhow::Context;
use std::io::ErrorKind;
use std::path::Path;

pub struct SnapshotLoader;

impl SnapshotLoader {
    /// `Ok(None)` when there is no file at `filepath`. Any other failure to read or decode is an error.
    pub fn load_from_filepath(filepath: &Path) -> anyhow::Result<Option<Snapshot>> {
        let file = match std::fs::File::open(filepath) {
            | Ok(file) => file,
            | Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            | Err(err) => {
                return Err(err).with_context(|| format!("opening {}", filepath.display()));
            },
        };

        // empty files can't be mapped on every platform
        if file.metadata()?.len() == 0 {
            return Ok(Some(Self::load_from_bytes(&[])?));
        }

        // Optimization: OS maps the file pages into VM pages and the data is read from the file only when the VM page is accessed.
        // SAFETY: the mapping is read-only and dropped before this function returns.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .with_context(|| format!("mapping {}", filepath.display()))?;
        let snapshot = Self::load_from_bytes(&mmap)
            .with_context(|| format!("decoding {}", filepath.display()))?;
        Ok(Some(snapshot))
    }

    pub fn load_from_bytes(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
        let decoder: BytesDecoder<DecoderInit> = bytes.into();
        decoder.load_header()?.load_metadata()?.load_database()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::saves::endec::StoredDuration;
    use crate::domains::saves::snapshot::Metadata;
    use std::io::Write;

    // REDIS0011, one aux field, db 0 holding "foo" -> "bar" and an expiring "baz" -> "qux"
    fn sample_snapshot() -> Vec<u8> {
        let mut data = b"REDIS0011".to_vec();
        data.extend_from_slice(&[0xFA, 0x09]);
        data.extend_from_slice(b"redis-ver");
        data.extend_from_slice(&[0x05]);
        data.extend_from_slice(b"7.2.0");
        data.extend_from_slice(&[0xFE, 0x00, 0xFB, 0x02, 0x01]);
        data.extend_from_slice(&[0x00, 0x03]);
        data.extend_from_slice(b"foo");
        data.extend_from_slice(&[0x03]);
        data.extend_from_slice(b"bar");
        data.extend_from_slice(&[0xFC, 0x15, 0x72, 0xE7, 0x07, 0x8F, 0x01, 0x00, 0x00]);
        data.extend_from_slice(&[0x00, 0x03]);
        data.extend_from_slice(b"baz");
        data.extend_from_slice(&[0x03]);
        data.extend_from_slice(b"qux");
        data.extend_from_slice(&[0xFF, 0xDE, 0xAD, 0xBE, 0xEF, 0xDE, 0xAD, 0xBE, 0xEF]);
        data
    }

    #[test]
    fn test_load_from_bytes() {
        // WHEN
        let snapshot = SnapshotLoader::load_from_bytes(&sample_snapshot()).unwrap();

        // THEN
        assert_eq!(snapshot.header.magic, "REDIS");
        assert_eq!(snapshot.header.version, "0011");
        assert_eq!(
            snapshot.metadata,
            vec![Metadata { name: "redis-ver".into(), value: "7.2.0".into() }]
        );
        assert_eq!(snapshot.checksum, [0xDE, 0xAD, 0xBE, 0xEF, 0xDE, 0xAD, 0xBE, 0xEF]);

        let entries: Vec<_> = snapshot.into_entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "foo");
        assert_eq!(entries[0].value, "bar");
        assert_eq!(entries[1].expiry, Some(StoredDuration::Milliseconds(1713824559637)));
    }

    #[test]
    fn test_decoding_is_deterministic() {
        // GIVEN
        let bytes = sample_snapshot();

        // WHEN
        let first = SnapshotLoader::load_from_bytes(&bytes).unwrap();
        let second = SnapshotLoader::load_from_bytes(&bytes).unwrap();

        // THEN
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_file_is_header_error() {
        let err = SnapshotLoader::load_from_bytes(b"REDIS00").unwrap_err();
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let loaded = SnapshotLoader::load_from_filepath(&dir.path().join("dump.rdb")).unwrap();

        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_from_filepath() {
        // GIVEN
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.rdb");
        std::fs::File::create(&path).unwrap().write_all(&sample_snapshot()).unwrap();

        // WHEN
        let snapshot = SnapshotLoader::load_from_filepath(&path).unwrap().unwrap();

        // THEN
        assert_eq!(snapshot.databases.len(), 1);
        assert_eq!(snapshot.databases[0].entries.len(), 2);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.rdb");
        let mut corrupt = sample_snapshot();
        corrupt.truncate(corrupt.len() - 12);
        std::fs::write(&path, corrupt).unwrap();

        assert!(SnapshotLoader::load_from_filepath(&path).is_err());
        std::fs::write(&path, b"").unwrap();
        assert!(SnapshotLoader::load_from_filepath(&path).is_err());
    }
}
