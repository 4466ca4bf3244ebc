use super::{PoolError, TaskHandle};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    stop: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

/// Fixed number of persistent worker threads sharing one FIFO.
///
/// The thread count is decided at construction and never changes. A pool
/// with zero threads accepts work but never runs it.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                stop: false,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let shared = Arc::clone(&shared);
            let worker = thread::Builder::new()
                .name(format!("latch-worker-{index}"))
                .spawn(move || run_worker(shared))?;
            workers.push(worker);
        }

        tracing::debug!(threads, "worker pool started");
        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            threads,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }

    /// Append `task` to the queue and wake one idle worker.
    pub fn enqueue<F, R>(&self, task: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            if outcome.is_err() {
                tracing::error!("task panicked on worker thread");
            }
            // The submitter may have dropped its handle already.
            let _ = sender.send(outcome.map_err(|_| PoolError::TaskPanicked));
        });

        {
            let mut queue = self.shared.queue.lock();
            if queue.stop {
                return Err(PoolError::ShutDown);
            }
            queue.jobs.push_back(job);
        }
        self.shared.available.notify_one();

        Ok(TaskHandle::new(receiver))
    }

    /// Signal stop, wake every worker and join them.
    ///
    /// Jobs already taken by a worker run to completion; jobs still queued are
    /// dropped. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        let abandoned = {
            let mut queue = self.shared.queue.lock();
            queue.stop = true;
            std::mem::take(&mut queue.jobs)
        };
        self.shared.available.notify_all();

        if !abandoned.is_empty() {
            tracing::debug!(count = abandoned.len(), "dropping queued jobs on shutdown");
        }
        // Dropped outside the queue lock: a job's captures may take other locks.
        drop(abandoned);

        let current = thread::current().id();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::warn!("worker thread exited with a panic");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            while !queue.stop && queue.jobs.is_empty() {
                shared.available.wait(&mut queue);
            }
            if queue.stop {
                return;
            }
            let Some(job) = queue.jobs.pop_front() else {
                continue;
            };
            job
        };
        job();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn returns_task_results() {
        let pool = WorkerPool::new(2).unwrap();
        let handles: Vec<_> = (0..16u64)
            .map(|i| pool.enqueue(move || i * i).unwrap())
            .collect();

        let results: Vec<u64> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
        assert_eq!(results, (0..16u64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn single_worker_runs_in_fifo_order() {
        let pool = WorkerPool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let order = Arc::clone(&order);
                pool.enqueue(move || order.lock().push(i)).unwrap()
            })
            .collect();
        for handle in handles {
            handle.wait().unwrap();
        }
        assert_eq!(*order.lock(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn enqueue_after_shutdown_fails() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();
        assert!(matches!(pool.enqueue(|| ()), Err(PoolError::ShutDown)));
    }

    #[test]
    fn panicking_task_keeps_worker_alive() {
        let pool = WorkerPool::new(1).unwrap();
        let bad = pool.enqueue(|| panic!("boom")).unwrap();
        assert!(matches!(bad.wait(), Err(PoolError::TaskPanicked)));

        let good = pool.enqueue(|| 5).unwrap();
        assert_eq!(good.wait().unwrap(), 5);
    }

    #[test]
    fn shutdown_runs_dequeued_and_drops_queued() {
        let pool = WorkerPool::new(1).unwrap();
        let (started_tx, started_rx) = crossbeam_channel::bounded(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let running = {
            let ran = Arc::clone(&ran);
            pool.enqueue(move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let queued = {
            let ran = Arc::clone(&ran);
            pool.enqueue(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };
        assert_eq!(pool.queued(), 1);

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            release_tx.send(()).unwrap();
        });
        pool.shutdown();
        releaser.join().unwrap();

        assert!(running.wait().is_ok());
        assert!(matches!(queued.wait(), Err(PoolError::TaskDropped)));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn try_take_reports_pending_then_ready() {
        let pool = WorkerPool::new(1).unwrap();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = pool
            .enqueue(move || {
                release_rx.recv().unwrap();
                "done"
            })
            .unwrap();

        assert!(handle.try_take().is_none());
        release_tx.send(()).unwrap();
        assert_eq!(handle.wait().unwrap(), "done");
    }
}
