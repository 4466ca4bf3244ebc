use crate::manifest::ManifestError;
use crate::resource::ResourceError;
use crate::ResourceId;
use latch_core::jobs::PoolError;
use thiserror::Error;

/// Errors surfaced by [`ResourceRegistry`](super::ResourceRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("resource {0} is not in the catalog")]
    UnknownResource(ResourceId),

    #[error("resource {id} is a {found}, requested as {expected}")]
    KindMismatch {
        id: ResourceId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("resource {0} released more times than it was acquired")]
    RefCountUnderflow(ResourceId),

    #[error("registry is already attached")]
    AlreadyAttached,

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("resource {id} failed to load: {source}")]
    Resource {
        id: ResourceId,
        #[source]
        source: ResourceError,
    },

    #[error("worker pool rejected a construction task: {0}")]
    Pool(#[from] PoolError),
}
