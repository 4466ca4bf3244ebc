use crate::events::{EventBus, ResourceEvent};
use crate::io::AssetIo;
use crate::resource::{ResourceDescriptor, ResourceError, ResourceInstance};
use crate::ResourceId;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread::ThreadId;

/// Where a resource sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// No live instance.
    Unrequested,
    /// Waiting for (or undergoing) its storage read.
    DiskLoadQueued,
    /// Read from storage this tick; construction is considered next tick.
    DiskLoaded,
    /// Read from storage, waiting for a construction slot.
    ProcessingQueued,
    /// Construction running inline or on a worker.
    Processing,
    Loaded,
    /// Last reference released; reclaimed on a later tick unless re-acquired.
    UnloadQueued,
    Failed,
}

/// Queue lengths and table sizes at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub catalog: usize,
    pub live: usize,
    pub disk_queued: usize,
    pub processing_queued: usize,
    pub unload_queued: usize,
    pub in_flight: usize,
}

/// Work done by one [`update`](super::ResourceRegistry::update).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub disk_reads: usize,
    /// Construction tasks handed to the worker pool.
    pub dispatched: usize,
    /// Main-thread constructions run inside the tick.
    pub constructed_inline: usize,
    pub reclaimed: usize,
}

/// Catalog, ref counts, live instances and the three queues, behind one lock.
#[derive(Default)]
pub(super) struct RegistryState {
    pub attached: bool,
    pub main_thread: Option<ThreadId>,
    pub catalog: HashMap<ResourceId, Arc<ResourceDescriptor>>,
    pub ref_counts: HashMap<ResourceId, usize>,
    pub instances: HashMap<ResourceId, Arc<ResourceInstance>>,
    pub disk_queue: VecDeque<Arc<ResourceInstance>>,
    pub memory_queue: VecDeque<Arc<ResourceInstance>>,
    pub unload_queue: VecDeque<ResourceId>,
    pub disk_loaded: HashSet<ResourceId>,
    pub processing: HashSet<ResourceId>,
    pub failed: HashSet<ResourceId>,
    pub in_flight: usize,
}

impl RegistryState {
    pub fn ref_count(&self, id: ResourceId) -> usize {
        self.ref_counts.get(&id).copied().unwrap_or(0)
    }

    pub fn enqueue_unload(&mut self, id: ResourceId) {
        if !self.unload_queue.contains(&id) {
            self.unload_queue.push_back(id);
        }
    }

    pub fn state_of(&self, id: ResourceId) -> ResourceState {
        let Some(instance) = self.instances.get(&id) else {
            return ResourceState::Unrequested;
        };
        if self.unload_queue.contains(&id) {
            ResourceState::UnloadQueued
        } else if self.failed.contains(&id) {
            ResourceState::Failed
        } else if self.processing.contains(&id) {
            ResourceState::Processing
        } else if instance.is_loaded() {
            ResourceState::Loaded
        } else if self.disk_loaded.contains(&id) {
            ResourceState::DiskLoaded
        } else if self.memory_queue.iter().any(|queued| queued.id() == id) {
            ResourceState::ProcessingQueued
        } else {
            ResourceState::DiskLoadQueued
        }
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            catalog: self.catalog.len(),
            live: self.instances.len(),
            disk_queued: self.disk_queue.len(),
            processing_queued: self.memory_queue.len(),
            unload_queued: self.unload_queue.len(),
            in_flight: self.in_flight,
        }
    }
}

/// State shared between the registry and the construction tasks it spawns.
///
/// Tasks hold this, never the worker pool, so a task can outlive the
/// registry handle that dispatched it.
pub(super) struct Shared {
    pub io: AssetIo,
    pub state: Mutex<RegistryState>,
    pub drained: Condvar,
    pub events: EventBus,
}

impl Shared {
    pub fn new(io: AssetIo) -> Self {
        Self {
            io,
            state: Mutex::new(RegistryState::default()),
            drained: Condvar::new(),
            events: EventBus::default(),
        }
    }

    /// Record the outcome of a storage read or construction.
    ///
    /// A resource nobody references any more goes straight to the unload
    /// queue, loaded or failed.
    pub fn settle(&self, id: ResourceId, outcome: &Result<(), ResourceError>) {
        let mut state = self.state.lock();
        state.processing.remove(&id);
        if outcome.is_err() {
            state.failed.insert(id);
        }
        if state.instances.contains_key(&id) && state.ref_count(id) == 0 {
            state.enqueue_unload(id);
        }
    }

    /// Log and broadcast the outcome. Call without the state lock held.
    pub fn announce(&self, id: ResourceId, outcome: &Result<(), ResourceError>) {
        match outcome {
            Ok(()) => {
                tracing::debug!(%id, "resource loaded");
                self.events.publish(ResourceEvent::Loaded(id));
            }
            Err(err) => {
                tracing::error!(%id, error = %err, "resource failed to load");
                self.events.publish(ResourceEvent::Failed {
                    id,
                    reason: err.to_string(),
                });
            }
        }
    }
}

/// One slot of the in-flight budget, released on drop.
///
/// Dropping covers every exit: normal completion, a panicking construction
/// and a task the pool discarded without running.
pub(super) struct InFlight {
    shared: Arc<Shared>,
    id: ResourceId,
}

impl InFlight {
    /// Take a slot. The caller holds the state lock.
    pub fn claim(shared: &Arc<Shared>, state: &mut RegistryState, id: ResourceId) -> Self {
        state.in_flight += 1;
        state.processing.insert(id);
        Self {
            shared: Arc::clone(shared),
            id,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.processing.remove(&self.id);
        if state.in_flight == 0 {
            self.shared.drained.notify_all();
        }
    }
}
