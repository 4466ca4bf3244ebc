//! Resource identity
//!
//! Resources are keyed by an opaque 64-bit value. Identity is by value: two
//! ids are equal iff their integers are equal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque 64-bit resource key.
///
/// `ResourceId::new()` draws a random value; `from_raw` wraps a known key,
/// typically one baked into calling code from the manifest:
///
/// ```ignore
/// const MODEL_SPONZA_OBJ: ResourceId = ResourceId::from_raw(0x7c1f_22d3_9a40_e611);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Zero value returned by lookups that found nothing.
    pub const NONE: ResourceId = ResourceId(0);

    /// Random id. Never returns [`ResourceId::NONE`].
    pub fn new() -> Self {
        loop {
            let raw: u64 = rand::random();
            if raw != 0 {
                return Self(raw);
            }
        }
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for ResourceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<ResourceId> for u64 {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({:016x})", self.0)
    }
}
