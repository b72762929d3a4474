use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was stopped; the task was not queued.
    #[error("thread pool is closed")]
    Closed,
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}
