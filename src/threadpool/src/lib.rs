//! A fixed-size pool of worker threads fed from one shared task queue.
//!
//! ```no_run
//! use threadpool::ThreadPool;
//!
//! let mut pool = ThreadPool::builder().workers(4).build()?;
//! pool.submit(|| println!("hello from a worker"))?;
//! pool.stop();
//! # Ok::<(), threadpool::PoolError>(())
//! ```

pub mod config;
pub mod error;
pub mod pool;
pub mod queue;

pub use config::Config;
pub use error::{PoolError, Result};
pub use pool::{Builder, Stats, ThreadPool};
pub use queue::{Pop, SafeQueue, POP_TIMEOUT};

pub type Task = Box<dyn FnOnce() + Send + 'static>;
