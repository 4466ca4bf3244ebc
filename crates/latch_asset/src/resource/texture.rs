use super::{Resource, ResourceError, ResourceKind};
use crate::io::AssetIo;

/// Decoded RGBA8 image, rows stored bottom-up for GPU upload.
///
/// Construction is bound to the main thread: it is the step that hands the
/// pixels to the graphics context.
#[derive(Debug, Default)]
pub struct Texture {
    encoded: Option<Vec<u8>>,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Texture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Tightly packed RGBA8, `width * height * 4` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(super) fn load_from_storage(&mut self, io: &AssetIo, path: &str) -> Result<(), ResourceError> {
        self.encoded = Some(io.read(path)?);
        Ok(())
    }

    pub(super) fn load(&mut self, path: &str) -> Result<(), ResourceError> {
        let encoded = self.encoded.take().ok_or_else(|| ResourceError::NotInMemory {
            path: path.to_string(),
        })?;

        let image = image::load_from_memory(&encoded).map_err(|source| ResourceError::Texture {
            path: path.to_string(),
            source,
        })?;
        let rgba = image.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();

        self.width = width;
        self.height = height;
        self.pixels = rgba.into_raw();
        tracing::trace!(path, width, height, "texture decoded");
        Ok(())
    }

    pub(super) fn unload(&mut self) {
        *self = Self::default();
    }
}

impl ResourceKind for Texture {
    const NAME: &'static str = "texture";

    fn create() -> Resource {
        Resource::Texture(Texture::default())
    }

    fn project(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Texture(texture) => Some(texture),
            _ => None,
        }
    }
}
