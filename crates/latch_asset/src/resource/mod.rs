//! Resource kinds and live instances
//!
//! Every resource goes through two steps before it is usable:
//!
//! 1. **storage read**: raw bytes are pulled from disk or the data container,
//!    always on the thread driving the registry.
//! 2. **construction**: the bytes are turned into the in-memory form. Kinds
//!    that touch the graphics context ([`Texture`]) construct on the main
//!    thread; everything else constructs on the worker pool.
//!
//! The set of kinds is closed. [`Resource`] dispatches each step with an
//! exhaustive match, and [`ResourceKind`] maps a Rust type to its variant.

mod binary;
mod model;
mod texture;

pub use binary::Binary;
pub use model::{Model, ModelMaterial, ModelObject};
pub use texture::Texture;

use crate::io::{AssetIo, AssetIoError};
use crate::ResourceId;
use latch_core::sync::Guarded;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Io(#[from] AssetIoError),

    #[error("failed to parse model {path}: {source}")]
    Model {
        path: String,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to decode texture {path}: {source}")]
    Texture {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("{path} was constructed before it was read from storage")]
    NotInMemory { path: String },
}

/// Maps a resource type to its [`Resource`] variant.
pub trait ResourceKind: Sized + Send + Sync + 'static {
    const NAME: &'static str;

    /// Empty, unloaded value of this kind.
    fn create() -> Resource;

    fn project(resource: &Resource) -> Option<&Self>;
}

pub enum Resource {
    Model(Model),
    Texture(Texture),
    Binary(Binary),
}

impl Resource {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Resource::Model(_) => Model::NAME,
            Resource::Texture(_) => Texture::NAME,
            Resource::Binary(_) => Binary::NAME,
        }
    }

    /// Construction must run on the thread that drives the registry.
    pub fn limit_to_main_thread(&self) -> bool {
        match self {
            Resource::Texture(_) => true,
            Resource::Model(_) | Resource::Binary(_) => false,
        }
    }

    fn load_from_storage(&mut self, io: &AssetIo, path: &str) -> Result<(), ResourceError> {
        match self {
            Resource::Model(model) => model.load_from_storage(io, path),
            Resource::Texture(texture) => texture.load_from_storage(io, path),
            Resource::Binary(binary) => binary.load_from_storage(io, path),
        }
    }

    fn load(&mut self, path: &str) -> Result<(), ResourceError> {
        match self {
            Resource::Model(model) => model.load(path),
            Resource::Texture(texture) => texture.load(path),
            Resource::Binary(binary) => binary.load(path),
        }
    }

    fn unload(&mut self) {
        match self {
            Resource::Model(model) => model.unload(),
            Resource::Texture(texture) => texture.unload(),
            Resource::Binary(binary) => binary.unload(),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource::{}", self.kind_name())
    }
}

/// Catalog row: one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub name: String,
    pub path: String,
    pub category: String,
}

/// A materialized resource, shared by every handle to its id.
pub struct ResourceInstance {
    descriptor: Arc<ResourceDescriptor>,
    kind: &'static str,
    main_thread_only: bool,
    loaded_from_storage: Guarded<bool>,
    loaded: Guarded<bool>,
    resource: RwLock<Resource>,
}

impl ResourceInstance {
    pub(crate) fn new(descriptor: Arc<ResourceDescriptor>, resource: Resource) -> Self {
        Self {
            descriptor,
            kind: resource.kind_name(),
            main_thread_only: resource.limit_to_main_thread(),
            loaded_from_storage: Guarded::new(false),
            loaded: Guarded::new(false),
            resource: RwLock::new(resource),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.descriptor.id
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn is_loaded_from_storage(&self) -> bool {
        self.loaded_from_storage.get()
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind
    }

    pub fn limit_to_main_thread(&self) -> bool {
        self.main_thread_only
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Resource> {
        self.resource.read()
    }

    /// Typed view of the resource, `None` if it is another kind.
    ///
    /// Does not check [`is_loaded`](Self::is_loaded).
    pub fn get<T: ResourceKind>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.resource.read(), T::project).ok()
    }

    pub fn is<T: ResourceKind>(&self) -> bool {
        self.kind == T::NAME
    }

    pub(crate) fn load_from_storage(&self, io: &AssetIo) -> Result<(), ResourceError> {
        self.resource
            .write()
            .load_from_storage(io, &self.descriptor.path)?;
        self.loaded_from_storage.set(true);
        Ok(())
    }

    pub(crate) fn load(&self) -> Result<(), ResourceError> {
        self.resource.write().load(&self.descriptor.path)?;
        self.loaded.set(true);
        Ok(())
    }

    /// Drop the constructed data and clear both flags.
    ///
    /// If a reader still holds a view from [`get`](Self::get), the data is
    /// left in place and freed with the last `Arc` to this instance. Returns
    /// whether the data was dropped here.
    pub(crate) fn unload(&self) -> bool {
        self.loaded.set(false);
        self.loaded_from_storage.set(false);
        match self.resource.try_write() {
            Some(mut resource) => {
                resource.unload();
                true
            }
            None => {
                tracing::warn!(
                    id = %self.id(),
                    "resource still borrowed on unload; data freed with the last reference"
                );
                false
            }
        }
    }
}

impl fmt::Debug for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceInstance")
            .field("id", &self.descriptor.id)
            .field("kind", &self.kind)
            .field("path", &self.descriptor.path)
            .field("loaded_from_storage", &self.is_loaded_from_storage())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str) -> Arc<ResourceDescriptor> {
        Arc::new(ResourceDescriptor {
            id: ResourceId::from_raw(7),
            name: "config".to_string(),
            path: path.to_string(),
            category: "binaries".to_string(),
        })
    }

    #[test]
    fn instance_walks_storage_load_unload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("engine.json"), b"{\"vsync\":true}").unwrap();
        let io = AssetIo::new(dir.path());

        let instance = ResourceInstance::new(descriptor("engine.json"), Binary::create());
        assert!(!instance.limit_to_main_thread());
        assert!(!instance.is_loaded_from_storage());

        instance.load_from_storage(&io).unwrap();
        assert!(instance.is_loaded_from_storage());
        assert!(!instance.is_loaded());

        instance.load().unwrap();
        assert!(instance.is_loaded());
        assert_eq!(instance.get::<Binary>().unwrap().bytes(), b"{\"vsync\":true}");

        assert!(instance.unload());
        assert!(!instance.is_loaded());
        assert!(!instance.is_loaded_from_storage());
        assert!(instance.get::<Binary>().unwrap().is_empty());
    }

    #[test]
    fn unload_while_borrowed_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("engine.json"), b"{}").unwrap();
        let instance = ResourceInstance::new(descriptor("engine.json"), Binary::create());
        instance.load_from_storage(&AssetIo::new(dir.path())).unwrap();
        instance.load().unwrap();

        let view = instance.get::<Binary>().unwrap();
        assert!(!instance.unload());
        assert!(!instance.is_loaded());
        assert_eq!(view.bytes(), b"{}");
    }

    #[test]
    fn typed_access_rejects_other_kinds() {
        let instance = ResourceInstance::new(descriptor("bricks.png"), Texture::create());
        assert!(instance.limit_to_main_thread());
        assert!(instance.is::<Texture>());
        assert!(instance.get::<Model>().is_none());
        assert_eq!(instance.kind_name(), "texture");
    }

    #[test]
    fn texture_decodes_flipped_rgba() {
        let dir = tempfile::tempdir().unwrap();
        // Top row red, bottom row blue.
        let mut stripe = image::RgbaImage::new(1, 2);
        stripe.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        stripe.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        stripe.save(dir.path().join("stripe.png")).unwrap();

        let instance = ResourceInstance::new(descriptor("stripe.png"), Texture::create());
        instance.load_from_storage(&AssetIo::new(dir.path())).unwrap();
        instance.load().unwrap();

        let texture = instance.get::<Texture>().unwrap();
        assert_eq!(texture.dimensions(), (1, 2));
        assert_eq!(&texture.pixels()[..4], &[0, 0, 255, 255]);
        assert_eq!(&texture.pixels()[4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn corrupt_texture_reports_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();

        let instance = ResourceInstance::new(descriptor("broken.png"), Texture::create());
        instance.load_from_storage(&AssetIo::new(dir.path())).unwrap();
        assert!(matches!(
            instance.load(),
            Err(ResourceError::Texture { .. })
        ));
        assert!(!instance.is_loaded());
    }
}
