use super::{Resource, ResourceError, ResourceKind};
use crate::io::AssetIo;

/// Raw bytes: shaders, configs and anything else consumed as-is.
#[derive(Debug, Default)]
pub struct Binary {
    staged: Option<Vec<u8>>,
    bytes: Vec<u8>,
}

impl Binary {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(super) fn load_from_storage(&mut self, io: &AssetIo, path: &str) -> Result<(), ResourceError> {
        self.staged = Some(io.read(path)?);
        Ok(())
    }

    pub(super) fn load(&mut self, path: &str) -> Result<(), ResourceError> {
        self.bytes = self.staged.take().ok_or_else(|| ResourceError::NotInMemory {
            path: path.to_string(),
        })?;
        Ok(())
    }

    pub(super) fn unload(&mut self) {
        self.staged = None;
        self.bytes = Vec::new();
    }
}

impl ResourceKind for Binary {
    const NAME: &'static str = "binary";

    fn create() -> Resource {
        Resource::Binary(Binary::default())
    }

    fn project(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Binary(binary) => Some(binary),
            _ => None,
        }
    }
}
