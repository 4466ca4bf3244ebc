//! Fixed-size job scheduler
//!
//! A `WorkerPool` owns a fixed number of persistent threads draining one
//! shared FIFO. Each submitted closure yields a `TaskHandle` the submitter can
//! wait on. No priorities, no cancellation, no timeouts.

mod pool;
mod task;

pub use pool::WorkerPool;
pub use task::TaskHandle;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool has been shut down")]
    ShutDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("task panicked while running on a worker")]
    TaskPanicked,

    #[error("task was dropped before a worker picked it up")]
    TaskDropped,
}
