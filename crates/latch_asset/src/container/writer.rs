use super::{record_name, PackError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends records to a container file, creating it if needed.
pub struct ContainerWriter {
    path: PathBuf,
    out: BufWriter<File>,
    bytes_written: u64,
}

impl ContainerWriter {
    pub fn open_append(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn append_record(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        let name_len = length_prefix(name.len())?;
        let data_len = length_prefix(data.len())?;

        self.out.write_all(&name_len.to_le_bytes())?;
        self.out.write_all(name.as_bytes())?;
        self.out.write_all(&data_len.to_le_bytes())?;
        self.out.write_all(data)?;

        self.bytes_written += (2 * super::LENGTH_FIELD_SIZE + name.len() + data.len()) as u64;
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<u64> {
        self.out.flush()?;
        Ok(self.bytes_written)
    }
}

fn length_prefix(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{len} bytes does not fit a u32 length prefix"),
        )
    })
}

/// Summary of one packing run.
#[derive(Debug, Clone)]
pub struct PackReport {
    pub output: PathBuf,
    pub records: Vec<String>,
    pub bytes_written: u64,
}

/// Append every input as a named record to `output`.
///
/// The output is opened first, then every input is read in full before the
/// first record is written, so an unreadable input leaves the container
/// as it was.
pub fn pack<P: AsRef<Path>>(
    output: Option<&Path>,
    type_tag: Option<&str>,
    inputs: &[P],
) -> Result<PackReport, PackError> {
    let output = output.ok_or(PackError::MissingOutput)?;
    let mut writer = ContainerWriter::open_append(output).map_err(|source| PackError::OpenOutput {
        path: output.to_path_buf(),
        source,
    })?;

    let mut records = Vec::with_capacity(inputs.len());
    for input in inputs {
        let input = input.as_ref();
        let data = fs::read(input).map_err(|source| PackError::OpenInput {
            path: input.to_path_buf(),
            source,
        })?;
        if u32::try_from(data.len()).is_err() {
            return Err(PackError::InputTooLarge {
                path: input.to_path_buf(),
                len: data.len(),
            });
        }
        records.push((record_name(input, type_tag), data));
    }

    let write_err = |source| PackError::Write {
        path: output.to_path_buf(),
        source,
    };
    for (name, data) in &records {
        writer.append_record(name, data).map_err(write_err)?;
        tracing::debug!(record = %name, size = data.len(), "packed record");
    }
    let bytes_written = writer.finish().map_err(write_err)?;

    tracing::info!(
        output = %output.display(),
        records = records.len(),
        bytes_written,
        "container updated"
    );

    Ok(PackReport {
        output: output.to_path_buf(),
        records: records.into_iter().map(|(name, _)| name).collect(),
        bytes_written,
    })
}
