//! Small synchronization helpers
//!
//! `Guarded<T>` publishes a single value across threads without exposing a
//! lock at every call site.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Mutex-protected slot for a single value.
///
/// Clones share the same slot, so a flag can be handed to a worker thread and
/// observed from the main thread.
///
/// ```ignore
/// let loaded = Guarded::new(false);
/// let remote = loaded.clone();
/// std::thread::spawn(move || remote.set(true)).join().unwrap();
/// assert!(loaded.get());
/// ```
pub struct Guarded<T> {
    slot: Arc<Mutex<T>>,
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(value)),
        }
    }

    pub fn set(&self, value: T) {
        *self.slot.lock() = value;
    }

    /// Store `value` and return the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.slot.lock(), value)
    }

    /// Run `f` with exclusive access to the value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.slot.lock())
    }
}

impl<T: Clone> Guarded<T> {
    pub fn get(&self) -> T {
        self.slot.lock().clone()
    }
}

impl<T> Clone for Guarded<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Default> Default for Guarded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guarded").field(&*self.slot.lock()).finish()
    }
}
