use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, trace};

use crate::config::Config;
use crate::error::{PoolError, Result};
use crate::queue::{Pop, SafeQueue};
use crate::Task;

/// Point-in-time counters for a [`ThreadPool`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub submitted: usize,
    /// Tasks that returned normally.
    pub executed: usize,
    pub panicked: usize,
    pub queued: usize,
}

struct Shared {
    queue: SafeQueue<Task>,
    pop_timeout: Duration,
    submitted: AtomicUsize,
    executed: AtomicUsize,
    panicked: AtomicUsize,
}

/// A fixed set of worker threads draining one shared FIFO of tasks.
///
/// Dropping the pool is the same as calling [`ThreadPool::stop`]: every task
/// accepted by [`ThreadPool::submit`] runs before the workers are joined.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    size: usize,
}

impl ThreadPool {
    /// Starts a pool sized to the host's hardware concurrency.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn with_config(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let shared = Arc::new(Shared {
            queue: SafeQueue::new(),
            pop_timeout: cfg.pop_timeout,
            submitted: AtomicUsize::new(0),
            executed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
        });
        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(cfg.workers),
            size: cfg.workers,
        };
        for index in 0..cfg.workers {
            let shared = pool.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", cfg.thread_name, index))
                .spawn(move || worker_loop(shared));
            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    error!("Spawning worker {} failed: {}", index, e);
                    pool.stop();
                    return Err(PoolError::Spawn(e));
                }
            }
        }
        debug!("Started {} workers", pool.size);
        Ok(pool)
    }

    /// Queues `task` for execution on some worker.
    ///
    /// Fails with [`PoolError::Closed`] once the pool has been stopped; a task
    /// that is accepted is guaranteed to run.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        // Counted before the push so `executed` never overtakes `submitted`.
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        if self.shared.queue.push(Box::new(task)).is_err() {
            self.shared.submitted.fetch_sub(1, Ordering::Relaxed);
            return Err(PoolError::Closed);
        }
        Ok(())
    }

    /// Closes the queue, lets the workers drain it and joins them.
    ///
    /// Blocks for as long as the remaining tasks take. Calling it again is a
    /// no-op.
    pub fn stop(&mut self) {
        self.shared.queue.close();
        if self.workers.is_empty() {
            return;
        }
        debug!(
            "Stopping pool, {} tasks still queued",
            self.shared.queue.len()
        );
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("{} exited abnormally", name);
            }
        }
        debug!("Pool stopped");
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        !self.shared.queue.is_closed()
    }

    pub fn stats(&self) -> Stats {
        // Finished counts first: a task seen as finished was counted as
        // submitted before it reached the queue.
        let executed = self.shared.executed.load(Ordering::Acquire);
        let panicked = self.shared.panicked.load(Ordering::Acquire);
        Stats {
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            executed,
            panicked,
            queued: self.shared.queue.len(),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    let current = thread::current();
    let name = current.name().unwrap_or("worker");
    trace!("{} started", name);
    loop {
        match shared.queue.pop(shared.pop_timeout) {
            Pop::Item(task) => run_task(name, task, &shared),
            Pop::Empty => thread::yield_now(),
            Pop::Closed => break,
        }
    }
    trace!("{} stopped", name);
}

// A panicking task is reported and counted; the worker keeps going.
fn run_task(name: &str, task: Task, shared: &Shared) {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(()) => {
            shared.executed.fetch_add(1, Ordering::Release);
        }
        Err(payload) => {
            shared.panicked.fetch_add(1, Ordering::Release);
            error!("Task panicked on {}: {}", name, panic_message(&*payload));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Fluent construction of a [`ThreadPool`] on top of [`Config`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    cfg: Config,
}

impl Builder {
    pub fn from_config(cfg: Config) -> Self {
        Self { cfg }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.cfg.workers = workers;
        self
    }

    pub fn pop_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.pop_timeout = timeout;
        self
    }

    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.cfg.thread_name = name.into();
        self
    }

    pub fn build(self) -> Result<ThreadPool> {
        ThreadPool::with_config(self.cfg)
    }
}
