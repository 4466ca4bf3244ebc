//! Resource file access
//!
//! Every resource path is relative to one root directory. A path that names a
//! record of the engine data container is served from the container's byte
//! range instead of the filesystem.

use crate::container::{BlobEntry, BlobIndex, ContainerError};
use once_cell::sync::OnceCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetIoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Container(#[from] ContainerError),
}

struct ContainerSource {
    path: PathBuf,
    index: OnceCell<BlobIndex>,
}

/// Reads resource bytes from the resource root or the data container.
pub struct AssetIo {
    root: PathBuf,
    container: Option<ContainerSource>,
}

impl AssetIo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            container: None,
        }
    }

    /// Serve matching names from `container` (relative to the root).
    ///
    /// The container is indexed lazily, on the first read that needs it.
    pub fn with_container(mut self, container: impl AsRef<Path>) -> Self {
        self.container = Some(ContainerSource {
            path: self.root.join(container),
            index: OnceCell::new(),
        });
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// The container index, building it on first call.
    ///
    /// A configured container that does not exist on disk indexes as empty.
    pub fn blob_index(&self) -> Result<Option<&BlobIndex>, AssetIoError> {
        let Some(container) = &self.container else {
            return Ok(None);
        };
        let index = container.index.get_or_try_init(|| {
            if !container.path.exists() {
                tracing::warn!(path = %container.path.display(), "data container not found");
                return Ok(BlobIndex::default());
            }
            BlobIndex::open(&container.path)
        })?;
        Ok(Some(index))
    }

    fn container_entry(&self, name: &str) -> Result<Option<(&Path, BlobEntry)>, AssetIoError> {
        let Some(index) = self.blob_index()? else {
            return Ok(None);
        };
        Ok(index.find(name).and_then(|entry| {
            self.container
                .as_ref()
                .map(|container| (container.path.as_path(), entry))
        }))
    }

    /// Whole contents of `path`.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, AssetIoError> {
        if let Some((container, entry)) = self.container_entry(path)? {
            return BlobIndex::read_entry(container, entry).map_err(|source| AssetIoError::Read {
                path: container.to_path_buf(),
                source,
            });
        }

        let full = self.resolve(path);
        fs::read(&full).map_err(|source| AssetIoError::Read { path: full, source })
    }

    pub fn exists(&self, path: &str) -> bool {
        matches!(self.container_entry(path), Ok(Some(_))) || self.resolve(path).is_file()
    }
}
