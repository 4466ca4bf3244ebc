//! Resource manifest
//!
//! Declares every resource the registry may load, grouped by category:
//!
//! ```json
//! {
//!   "models":   [ { "uuid": 8980173405117526545, "name": "sponza", "path": "models/sponza" } ],
//!   "textures": [ { "uuid": 1187, "name": "null", "path": "TEXTURE_NULL_PNG" } ]
//! }
//! ```

use crate::io::{AssetIo, AssetIoError};
use crate::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to load manifest: {0}")]
    Io(#[from] AssetIoError),

    #[error("malformed manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("resource id {id} is declared more than once")]
    DuplicateId { id: ResourceId },

    #[error("resource '{name}' uses the reserved id 0")]
    ReservedId { name: String },
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub uuid: u64,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    categories: BTreeMap<String, Vec<ManifestEntry>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse the manifest at `path` through `io`.
    pub fn load(io: &AssetIo, path: &str) -> Result<Self, ManifestError> {
        let bytes = io.read(path)?;
        let manifest: Manifest = serde_json::from_slice(&bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Builder-style insertion, mostly for tools and tests.
    pub fn with(
        mut self,
        category: &str,
        uuid: u64,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(ManifestEntry {
                uuid,
                name: name.into(),
                path: path.into(),
            });
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Every entry with the category it was declared in.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.categories
            .iter()
            .flat_map(|(category, entries)| entries.iter().map(move |e| (category.as_str(), e)))
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for (_, entry) in self.entries() {
            let id = ResourceId::from_raw(entry.uuid);
            if id.is_none() {
                return Err(ManifestError::ReservedId {
                    name: entry.name.clone(),
                });
            }
            if !seen.insert(id) {
                return Err(ManifestError::DuplicateId { id });
            }
        }
        Ok(())
    }
}
