use super::{ContainerError, LENGTH_FIELD_SIZE};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

/// Byte range of one record's data inside a container.
///
/// The zeroed entry doubles as "not found": callers treat `size == 0` as a miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobEntry {
    pub start: u32,
    pub size: u32,
}

impl BlobEntry {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn range(&self) -> Range<usize> {
        let start = self.start as usize;
        start..start + self.size as usize
    }
}

/// Name -> byte range lookup built by one linear scan of a container.
#[derive(Debug, Clone, Default)]
pub struct BlobIndex {
    entries: BTreeMap<String, BlobEntry>,
}

impl BlobIndex {
    /// Read and index the container at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::parse(&bytes)?;
        tracing::debug!(path = %path.display(), records = index.len(), "container indexed");
        Ok(index)
    }

    /// Index an in-memory container.
    ///
    /// A record whose header, name or data runs past the end of `bytes` stops
    /// the scan with [`ContainerError::Truncated`]. A later record with the same
    /// name shadows an earlier one.
    pub fn parse(bytes: &[u8]) -> Result<Self, ContainerError> {
        if u32::try_from(bytes.len()).is_err() {
            return Err(ContainerError::TooLarge { len: bytes.len() });
        }

        let mut entries = BTreeMap::new();
        let mut cursor = 0usize;
        while cursor < bytes.len() {
            let name_len = read_u32(bytes, cursor, "name length")? as usize;
            cursor += LENGTH_FIELD_SIZE;

            let name = take(bytes, cursor, name_len, "record name")?;
            let name = std::str::from_utf8(name)
                .map_err(|_| ContainerError::InvalidName { offset: cursor })?
                .to_owned();
            cursor += name_len;

            let size = read_u32(bytes, cursor, "data length")?;
            cursor += LENGTH_FIELD_SIZE;

            take(bytes, cursor, size as usize, "record data")?;
            // Bounded by the TooLarge check above.
            let start = cursor as u32;
            entries.insert(name, BlobEntry { start, size });
            cursor += size as usize;
        }

        Ok(Self { entries })
    }

    /// Entry for `name`, or the zeroed entry when absent.
    pub fn get(&self, name: &str) -> BlobEntry {
        self.entries.get(name).copied().unwrap_or_default()
    }

    pub fn find(&self, name: &str) -> Option<BlobEntry> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, BlobEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), *entry))
    }

    /// Read one entry's bytes straight from the container file.
    pub fn read_entry(container: impl AsRef<Path>, entry: BlobEntry) -> io::Result<Vec<u8>> {
        let mut file = File::open(container)?;
        file.seek(SeekFrom::Start(u64::from(entry.start)))?;
        let mut data = vec![0u8; entry.size as usize];
        file.read_exact(&mut data)?;
        Ok(data)
    }
}

fn take<'a>(
    bytes: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], ContainerError> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(ContainerError::Truncated {
            offset,
            what,
            needed: len,
            available: bytes.len().saturating_sub(offset),
        })
}

fn read_u32(bytes: &[u8], offset: usize, what: &'static str) -> Result<u32, ContainerError> {
    let raw = take(bytes, offset, LENGTH_FIELD_SIZE, what)?;
    let mut le = [0u8; LENGTH_FIELD_SIZE];
    le.copy_from_slice(raw);
    Ok(u32::from_le_bytes(le))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(name.len() as u32).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn empty_container_has_no_entries() {
        let index = BlobIndex::parse(&[]).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn miss_returns_zeroed_entry() {
        let index = BlobIndex::parse(&record("TEXTURE_NULL_PNG", b"png")).unwrap();
        let miss = index.get("TEXTURE_SKYBOX_PNG");
        assert_eq!(miss, BlobEntry::default());
        assert!(miss.is_empty());
        assert!(index.find("TEXTURE_SKYBOX_PNG").is_none());
        assert!(index.contains("TEXTURE_NULL_PNG"));
    }

    #[test]
    fn later_record_shadows_earlier() {
        let mut bytes = record("CONFIG_JSON", b"{}");
        let second_start = bytes.len() + 4 + "CONFIG_JSON".len() + 4;
        bytes.extend(record("CONFIG_JSON", b"{\"a\":1}"));

        let index = BlobIndex::parse(&bytes).unwrap();
        let entry = index.get("CONFIG_JSON");
        assert_eq!(entry.start as usize, second_start);
        assert_eq!(&bytes[entry.range()], b"{\"a\":1}");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn truncated_header_fails_closed() {
        let mut bytes = record("A", b"abc");
        bytes.extend_from_slice(&[7, 0]);

        let err = BlobIndex::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::Truncated {
                what: "name length",
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn data_running_past_end_fails_closed() {
        let mut bytes = record("A", b"abcdef");
        bytes.truncate(bytes.len() - 2);

        let err = BlobIndex::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::Truncated {
                what: "record data",
                needed: 6,
                available: 4,
                ..
            }
        ));
    }

    #[test]
    fn oversized_name_length_fails_closed() {
        let bytes = u32::MAX.to_le_bytes();
        assert!(matches!(
            BlobIndex::parse(&bytes),
            Err(ContainerError::Truncated { what: "record name", .. })
        ));
    }

    #[test]
    fn zero_length_records_are_indexed() {
        let index = BlobIndex::parse(&record("EMPTY", b"")).unwrap();
        assert!(index.contains("EMPTY"));
        assert!(index.get("EMPTY").is_empty());
    }
}
