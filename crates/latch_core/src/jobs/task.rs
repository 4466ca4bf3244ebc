use super::PoolError;
use crossbeam_channel::{Receiver, TryRecvError};

/// Eventual result of a task submitted to a [`WorkerPool`](super::WorkerPool).
#[must_use = "dropping a TaskHandle detaches the task; its result is discarded"]
pub struct TaskHandle<R> {
    result: Receiver<Result<R, PoolError>>,
}

impl<R> TaskHandle<R> {
    pub(crate) fn new(result: Receiver<Result<R, PoolError>>) -> Self {
        Self { result }
    }

    /// Block until the task has run.
    pub fn wait(self) -> Result<R, PoolError> {
        self.result.recv().map_err(|_| PoolError::TaskDropped)?
    }

    /// Take the result if the task already finished.
    pub fn try_take(&self) -> Option<Result<R, PoolError>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PoolError::TaskDropped)),
        }
    }
}
