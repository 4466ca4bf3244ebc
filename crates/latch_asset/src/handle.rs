//! Scoped resource ownership

use crate::registry::{RegistryError, ResourceRegistry};
use crate::resource::{ResourceInstance, ResourceKind};
use crate::ResourceId;
use parking_lot::MappedRwLockReadGuard;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// One counted reference to a resource.
///
/// Creating a handle acquires a reference through the registry; dropping it
/// releases exactly that reference. Clones acquire their own.
///
/// ```ignore
/// let sponza = ResourceHandle::<Model>::from_raw(&registry, 0x7c1f_22d3_9a40_e611)?;
/// if let Some(model) = sponza.get() {
///     draw(&model.objects()[0]);
/// }
/// ```
pub struct ResourceHandle<T: ResourceKind> {
    registry: ResourceRegistry,
    instance: Arc<ResourceInstance>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: ResourceKind> ResourceHandle<T> {
    /// Lazily load `id`: the resource is queued and becomes available on a
    /// later tick.
    pub fn new(registry: &ResourceRegistry, id: ResourceId) -> Result<Self, RegistryError> {
        Self::with_mode(registry, id, true)
    }

    pub fn with_mode(
        registry: &ResourceRegistry,
        id: ResourceId,
        lazy: bool,
    ) -> Result<Self, RegistryError> {
        let instance = registry.acquire::<T>(id, lazy)?;
        Ok(Self {
            registry: registry.clone(),
            instance,
            _kind: PhantomData,
        })
    }

    pub fn from_raw(registry: &ResourceRegistry, raw: u64) -> Result<Self, RegistryError> {
        Self::new(registry, ResourceId::from_raw(raw))
    }

    pub fn id(&self) -> ResourceId {
        self.instance.id()
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.is_loaded()
    }

    pub fn instance(&self) -> &Arc<ResourceInstance> {
        &self.instance
    }

    /// The resource, once loaded.
    pub fn get(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        if !self.instance.is_loaded() {
            return None;
        }
        self.instance.get::<T>()
    }
}

impl<T: ResourceKind> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        self.registry.retain(self.id());
        Self {
            registry: self.registry.clone(),
            instance: Arc::clone(&self.instance),
            _kind: PhantomData,
        }
    }
}

impl<T: ResourceKind> Drop for ResourceHandle<T> {
    fn drop(&mut self) {
        if let Err(err) = self.registry.unload_resource(self.id()) {
            tracing::warn!(id = %self.id(), error = %err, "failed to release resource handle");
        }
    }
}

impl<T: ResourceKind> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &T::NAME)
            .field("id", &self.id())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
