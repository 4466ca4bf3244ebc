//! Resource registry and per-tick scheduler
//!
//! The registry owns the catalog built from the manifest and every live
//! [`ResourceInstance`]. Requests only queue work; [`ResourceRegistry::update`]
//! advances it under a fixed per-tick budget:
//!
//! ```text
//! DiskLoadQueued ──(≤1 read per tick, caller thread)──▶ DiskLoaded
//! DiskLoaded ──(next tick)──▶ ProcessingQueued
//! ProcessingQueued ──(≤4 in flight; worker or inline)──▶ Loaded
//! Loaded ──(last handle dropped)──▶ UnloadQueued ──(≤6 per tick)──▶ freed
//! ```
//!
//! A tick that reads from storage ends there: construction and reclamation
//! wait for the next one.
//!
//! Catalog, ref counts, live instances and all queues sit behind a single
//! mutex. `update` is driven from one thread, the one that called `attach`.

mod error;
mod state;

pub use error::RegistryError;
pub use state::{RegistryStats, ResourceState, TickReport};

use crate::io::AssetIo;
use crate::manifest::Manifest;
use crate::resource::{ResourceDescriptor, ResourceInstance, ResourceKind};
use crate::settings::AssetSettings;
use crate::{ResourceEvent, ResourceId};
use crossbeam_channel::Receiver;
use latch_core::jobs::WorkerPool;
use state::{InFlight, Shared};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct RegistryInner {
    settings: AssetSettings,
    pool: Arc<WorkerPool>,
    shared: Arc<Shared>,
}

/// Explicitly owned resource registry. Clones share the same state.
#[derive(Clone)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

impl ResourceRegistry {
    pub fn new(settings: AssetSettings, pool: Arc<WorkerPool>) -> Self {
        let io = settings.asset_io();
        Self {
            inner: Arc::new(RegistryInner {
                settings,
                pool,
                shared: Arc::new(Shared::new(io)),
            }),
        }
    }

    pub fn settings(&self) -> &AssetSettings {
        &self.inner.settings
    }

    pub fn io(&self) -> &AssetIo {
        &self.inner.shared.io
    }

    /// Read the manifest named by the settings and build the catalog.
    pub fn attach(&self) -> Result<(), RegistryError> {
        let manifest = Manifest::load(self.io(), &self.inner.settings.manifest)?;
        self.attach_manifest(manifest)
    }

    /// Build the catalog from an already parsed manifest.
    ///
    /// The calling thread becomes the main thread: `update` must run on it.
    pub fn attach_manifest(&self, manifest: Manifest) -> Result<(), RegistryError> {
        manifest.validate()?;

        let mut state = self.inner.shared.state.lock();
        if state.attached {
            return Err(RegistryError::AlreadyAttached);
        }
        for (category, entry) in manifest.entries() {
            let id = ResourceId::from_raw(entry.uuid);
            state.catalog.insert(
                id,
                Arc::new(ResourceDescriptor {
                    id,
                    name: entry.name.clone(),
                    path: entry.path.clone(),
                    category: category.to_string(),
                }),
            );
            state.ref_counts.insert(id, 0);
        }
        state.attached = true;
        state.main_thread = Some(thread::current().id());

        tracing::info!(resources = state.catalog.len(), "resource registry attached");
        Ok(())
    }

    /// Wait for in-flight construction to drain, then free every instance
    /// and clear all tables.
    ///
    /// Eager loads running on other threads count as in flight. Views
    /// returned by [`ResourceHandle::get`](crate::ResourceHandle::get) may
    /// be held across this call; their data is freed when the last
    /// reference goes away.
    pub fn detach(&self) {
        let shared = &self.inner.shared;
        let instances: Vec<_> = {
            let mut state = shared.state.lock();
            while state.in_flight > 0 {
                shared.drained.wait(&mut state);
            }

            let instances = state.instances.drain().map(|(_, instance)| instance).collect();
            *state = Default::default();
            instances
        };

        let total = instances.len();
        let freed = instances.iter().filter(|instance| instance.unload()).count();
        tracing::info!(freed, borrowed = total - freed, "resource registry detached");
    }

    pub fn is_attached(&self) -> bool {
        self.inner.shared.state.lock().attached
    }

    /// Id of the catalog entry whose path is `path`, or [`ResourceId::NONE`].
    pub fn lookup_resource(&self, path: &str) -> ResourceId {
        self.inner
            .shared
            .state
            .lock()
            .catalog
            .values()
            .find(|descriptor| descriptor.path == path)
            .map_or(ResourceId::NONE, |descriptor| descriptor.id)
    }

    /// Live instance for `id`, creating it if needed.
    ///
    /// An existing instance is returned as is and its ref count is left
    /// alone. A new instance starts with one reference and is either queued
    /// (`lazy`) or read and constructed before this returns.
    pub fn load_resource<T: ResourceKind>(
        &self,
        id: ResourceId,
        lazy: bool,
    ) -> Result<Arc<ResourceInstance>, RegistryError> {
        self.request::<T>(id, lazy, false)
    }

    /// Like [`load_resource`](Self::load_resource) but always takes a
    /// reference, and pulls the id back out of the unload queue.
    ///
    /// This is what [`ResourceHandle`](crate::ResourceHandle) uses.
    pub fn acquire<T: ResourceKind>(
        &self,
        id: ResourceId,
        lazy: bool,
    ) -> Result<Arc<ResourceInstance>, RegistryError> {
        self.request::<T>(id, lazy, true)
    }

    fn request<T: ResourceKind>(
        &self,
        id: ResourceId,
        lazy: bool,
        count_existing: bool,
    ) -> Result<Arc<ResourceInstance>, RegistryError> {
        let shared = &self.inner.shared;
        let (instance, slot) = {
            let mut state = shared.state.lock();
            let descriptor = state
                .catalog
                .get(&id)
                .cloned()
                .ok_or(RegistryError::UnknownResource(id))?;

            if let Some(instance) = state.instances.get(&id).cloned() {
                if !instance.is::<T>() {
                    return Err(RegistryError::KindMismatch {
                        id,
                        expected: T::NAME,
                        found: instance.kind_name(),
                    });
                }
                if count_existing {
                    *state.ref_counts.entry(id).or_insert(0) += 1;
                    state.unload_queue.retain(|queued| *queued != id);
                }
                return Ok(instance);
            }

            let instance = Arc::new(ResourceInstance::new(descriptor, T::create()));
            state.instances.insert(id, Arc::clone(&instance));
            *state.ref_counts.entry(id).or_insert(0) += 1;

            if lazy {
                state.disk_queue.push_back(Arc::clone(&instance));
                tracing::trace!(%id, kind = T::NAME, "resource queued for disk load");
                return Ok(instance);
            }
            let slot = InFlight::claim(shared, &mut state, id);
            (instance, slot)
        };

        let outcome = instance
            .load_from_storage(&shared.io)
            .and_then(|()| instance.load());
        shared.settle(id, &outcome);
        drop(slot);
        shared.announce(id, &outcome);
        if let Err(source) = outcome {
            // The caller never gets the reference this call took.
            if let Err(err) = self.unload_resource(id) {
                tracing::warn!(%id, error = %err, "could not release failed resource");
            }
            return Err(RegistryError::Resource { id, source });
        }
        Ok(instance)
    }

    /// Add a reference to an id that already has a live instance.
    pub(crate) fn retain(&self, id: ResourceId) {
        let mut state = self.inner.shared.state.lock();
        if !state.catalog.contains_key(&id) {
            tracing::warn!(%id, "retain on a resource missing from the catalog");
            return;
        }
        *state.ref_counts.entry(id).or_insert(0) += 1;
        state.unload_queue.retain(|queued| *queued != id);
    }

    /// Drop one reference. At zero, a loaded (or failed) instance is queued
    /// for reclamation; an instance still loading is queued once it settles.
    pub fn unload_resource(&self, id: ResourceId) -> Result<(), RegistryError> {
        let mut state = self.inner.shared.state.lock();
        let count = state
            .ref_counts
            .get_mut(&id)
            .ok_or(RegistryError::UnknownResource(id))?;
        if *count == 0 {
            return Err(RegistryError::RefCountUnderflow(id));
        }
        *count -= 1;
        if *count > 0 {
            return Ok(());
        }

        let settled = state
            .instances
            .get(&id)
            .map(|instance| instance.is_loaded() || state.failed.contains(&id));
        if settled == Some(true) {
            state.enqueue_unload(id);
            tracing::trace!(%id, "resource queued for unload");
        }
        Ok(())
    }

    /// The instance for `id`, only once it has finished loading.
    pub fn get_resource(&self, id: ResourceId) -> Option<Arc<ResourceInstance>> {
        self.inner
            .shared
            .state
            .lock()
            .instances
            .get(&id)
            .filter(|instance| instance.is_loaded())
            .cloned()
    }

    /// Run one scheduling tick. Call once per frame from the main thread.
    ///
    /// A storage read or inline construction that fails is returned here and
    /// also broadcast as [`ResourceEvent::Failed`]. Worker-side failures are
    /// only broadcast.
    pub fn update(&self, delta: Duration) -> Result<TickReport, RegistryError> {
        let shared = &self.inner.shared;
        let budget = self.inner.settings.budget;
        let mut report = TickReport::default();

        let main_thread = shared.state.lock().main_thread;
        debug_assert!(
            main_thread.map_or(true, |main| main == thread::current().id()),
            "ResourceRegistry::update called off the main thread"
        );

        // Storage reads, on this thread and without the lock.
        for _ in 0..budget.disk_reads_per_tick {
            let Some(instance) = shared.state.lock().disk_queue.pop_front() else {
                break;
            };
            let id = instance.id();
            let outcome = instance.load_from_storage(&shared.io);
            if outcome.is_err() {
                shared.settle(id, &outcome);
                shared.announce(id, &outcome);
                outcome.map_err(|source| RegistryError::Resource { id, source })?;
            }
            let mut state = shared.state.lock();
            state.disk_loaded.insert(id);
            state.memory_queue.push_back(instance);
            report.disk_reads += 1;
        }
        if report.disk_reads > 0 {
            tracing::trace!(?report, "registry tick ended after storage reads");
            return Ok(report);
        }
        shared.state.lock().disk_loaded.clear();

        // Construction, bounded by the in-flight budget.
        loop {
            let mut state = shared.state.lock();
            if state.in_flight >= budget.max_in_flight {
                break;
            }
            let Some(instance) = state.memory_queue.pop_front() else {
                break;
            };
            let id = instance.id();

            if instance.limit_to_main_thread() {
                state.processing.insert(id);
                drop(state);

                let outcome = instance.load();
                shared.settle(id, &outcome);
                shared.announce(id, &outcome);
                outcome.map_err(|source| RegistryError::Resource { id, source })?;
                report.constructed_inline += 1;
                // Remaining work waits for the next tick.
                return Ok(report);
            }

            let slot = InFlight::claim(shared, &mut state, id);
            drop(state);

            let task_shared = Arc::clone(shared);
            let task_instance = Arc::clone(&instance);
            let submitted = self.inner.pool.enqueue(move || {
                let outcome = task_instance.load();
                task_shared.settle(id, &outcome);
                drop(slot);
                task_shared.announce(id, &outcome);
            });
            if let Err(err) = submitted {
                shared.state.lock().memory_queue.push_front(instance);
                return Err(err.into());
            }
            report.dispatched += 1;
        }

        // Reclamation. Only ids still unreferenced count against the budget.
        let reclaimed: Vec<_> = {
            let mut state = shared.state.lock();
            let mut reclaimed = Vec::new();
            while reclaimed.len() < budget.reclaims_per_tick {
                let Some(id) = state.unload_queue.pop_front() else {
                    break;
                };
                if state.ref_count(id) != 0 {
                    continue;
                }
                state.failed.remove(&id);
                if let Some(instance) = state.instances.remove(&id) {
                    reclaimed.push(instance);
                }
            }
            reclaimed
        };
        for instance in &reclaimed {
            instance.unload();
            tracing::trace!(id = %instance.id(), "resource reclaimed");
        }
        report.reclaimed = reclaimed.len();

        if report != TickReport::default() {
            tracing::trace!(?report, delta_ms = delta.as_secs_f64() * 1000.0, "registry tick");
        }
        Ok(report)
    }

    pub fn subscribe(&self) -> Receiver<ResourceEvent> {
        self.inner.shared.events.subscribe()
    }

    pub fn ref_count(&self, id: ResourceId) -> usize {
        self.inner.shared.state.lock().ref_count(id)
    }

    pub fn state_of(&self, id: ResourceId) -> ResourceState {
        self.inner.shared.state.lock().state_of(id)
    }

    pub fn stats(&self) -> RegistryStats {
        self.inner.shared.state.lock().stats()
    }

    pub fn catalog_len(&self) -> usize {
        self.inner.shared.state.lock().catalog.len()
    }

    pub fn descriptor(&self, id: ResourceId) -> Option<Arc<ResourceDescriptor>> {
        self.inner.shared.state.lock().catalog.get(&id).cloned()
    }

    /// Every catalog row, in no particular order.
    pub fn catalog(&self) -> Vec<Arc<ResourceDescriptor>> {
        self.inner.shared.state.lock().catalog.values().cloned().collect()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("root", &self.io().root())
            .field("stats", &self.stats())
            .finish()
    }
}
