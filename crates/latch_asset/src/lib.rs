//! Latch Asset Pipeline
//!
//! Resource lifecycle management: the engine data container, the manifest
//! catalog, and a registry that reads, constructs and reclaims resources under
//! a fixed per-tick budget.

pub mod container;
pub mod events;
pub mod handle;
pub mod id;
pub mod io;
pub mod manifest;
pub mod registry;
pub mod resource;
pub mod settings;

pub use events::{ResourceEvent, ResourceSink};
pub use handle::ResourceHandle;
pub use id::ResourceId;
pub use io::{AssetIo, AssetIoError};
pub use manifest::{Manifest, ManifestEntry, ManifestError};
pub use registry::{RegistryError, RegistryStats, ResourceRegistry, ResourceState, TickReport};
pub use resource::{
    Binary, Model, Resource, ResourceDescriptor, ResourceError, ResourceInstance, ResourceKind,
    Texture,
};
pub use settings::{AssetSettings, SchedulerBudget, SettingsError};
