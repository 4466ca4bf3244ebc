//! Engine data container
//!
//! Append-only binary file mapping record names to byte ranges. Every record
//! is laid out little-endian, back to back until end of file:
//!
//! ```text
//! u32   name_length
//! [u8]  name          (name_length bytes, not NUL-terminated)
//! u32   data_length
//! [u8]  data          (data_length bytes)
//! ```
//!
//! The packer appends records; [`BlobIndex`] scans a container once and
//! answers name -> (offset, size) lookups.

mod index;
mod writer;

pub use index::{BlobEntry, BlobIndex};
pub use writer::{pack, ContainerWriter, PackReport};

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Size of each length prefix in a record.
pub const LENGTH_FIELD_SIZE: usize = std::mem::size_of::<u32>();

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to read container {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("container truncated at offset {offset}: {what} needs {needed} bytes, {available} left")]
    Truncated {
        offset: usize,
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("record name at offset {offset} is not valid UTF-8")]
    InvalidName { offset: usize },

    #[error("container is {len} bytes, offsets are limited to u32")]
    TooLarge { len: usize },
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("no output path given")]
    MissingOutput,

    #[error("cannot open output {path}: {source}")]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open input {path}: {source}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("input {path} is {len} bytes, records are limited to u32")]
    InputTooLarge { path: PathBuf, len: usize },

    #[error("failed writing to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PackError {
    /// Process exit code reported by the packer tool.
    pub fn exit_code(&self) -> i32 {
        match self {
            PackError::MissingOutput | PackError::OpenOutput { .. } | PackError::Write { .. } => -2,
            PackError::OpenInput { .. } | PackError::InputTooLarge { .. } => -3,
        }
    }
}

/// Derive the record name for an input file.
///
/// `<TYPE>_<BASENAME>` upper-cased, with `.`, `/` and `\` replaced by `_` and
/// leading underscores stripped: `("textures/null.png", Some("texture"))`
/// becomes `TEXTURE_NULL_PNG`.
pub fn record_name(path: &Path, type_tag: Option<&str>) -> String {
    let full = path.to_string_lossy();
    let base = full.rsplit(['/', '\\']).next().unwrap_or("");

    let name: String = format!("{}_{}", type_tag.unwrap_or(""), base)
        .chars()
        .map(|c| match c {
            '.' | '/' | '\\' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    name.trim_start_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn record_names_follow_packer_rules() {
        assert_eq!(record_name(Path::new("A.txt"), Some("T")), "T_A_TXT");
        assert_eq!(
            record_name(Path::new("textures/null.png"), Some("texture")),
            "TEXTURE_NULL_PNG"
        );
        assert_eq!(
            record_name(Path::new("shaders\\sky.frag.spv"), Some("shader")),
            "SHADER_SKY_FRAG_SPV"
        );
        assert_eq!(record_name(Path::new("b.bin"), None), "B_BIN");
        assert_eq!(record_name(Path::new("_hidden.dat"), None), "HIDDEN_DAT");
    }

    #[test]
    fn packed_records_parse_back_to_source_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A.txt");
        let b = dir.path().join("B.bin");
        let b_bytes: Vec<u8> = (0..=255u8).rev().collect();
        fs::write(&a, b"hello").unwrap();
        fs::write(&b, &b_bytes).unwrap();
        let out = dir.path().join("EngineData.blob");

        let report = pack(Some(out.as_path()), Some("T"), &[&a, &b]).unwrap();
        assert_eq!(report.records, vec!["T_A_TXT", "T_B_BIN"]);

        let container = fs::read(&out).unwrap();
        let index = BlobIndex::parse(&container).unwrap();
        assert_eq!(index.len(), 2);

        let entry = index.get("T_A_TXT");
        assert_eq!(entry.start as usize, LENGTH_FIELD_SIZE + "T_A_TXT".len() + LENGTH_FIELD_SIZE);
        assert_eq!(entry.size, 5);
        assert_eq!(&container[entry.range()], b"hello");

        let entry = index.get("T_B_BIN");
        assert_eq!(entry.size as usize, b_bytes.len());
        assert_eq!(&container[entry.range()], b_bytes.as_slice());
        assert_eq!(BlobIndex::read_entry(&out, entry).unwrap(), b_bytes);
    }

    #[test]
    fn packing_appends_to_existing_container() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, b"one").unwrap();
        fs::write(&second, b"two").unwrap();
        let out = dir.path().join("data.blob");

        pack(Some(out.as_path()), Some("text"), &[&first]).unwrap();
        pack(Some(out.as_path()), Some("text"), &[&second]).unwrap();

        let index = BlobIndex::open(&out).unwrap();
        assert_eq!(
            BlobIndex::read_entry(&out, index.get("TEXT_FIRST_TXT")).unwrap(),
            b"one"
        );
        assert_eq!(
            BlobIndex::read_entry(&out, index.get("TEXT_SECOND_TXT")).unwrap(),
            b"two"
        );
    }

    #[test]
    fn missing_input_leaves_container_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, b"ok").unwrap();
        let out = dir.path().join("data.blob");

        let err = pack(Some(out.as_path()), None, &[good, dir.path().join("missing.txt")]).unwrap_err();
        assert!(matches!(err, PackError::OpenInput { .. }));
        assert_eq!(err.exit_code(), -3);
        assert_eq!(fs::metadata(&out).unwrap().len(), 0);
    }

    #[test]
    fn unopenable_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("no_such_dir").join("data.blob");
        let inputs: [&Path; 0] = [];

        let err = pack(Some(out.as_path()), None, &inputs).unwrap_err();
        assert!(matches!(err, PackError::OpenOutput { .. }));
        assert_eq!(err.exit_code(), -2);
        assert_eq!(pack(None, None, &inputs).unwrap_err().exit_code(), -2);
    }
}
