//! Crate-level error.
//!
//! Each concern keeps its own error enum; `SpindleError` is what `Worker::run`
//! and the other long-running entry points return.

use thiserror::Error;

use crate::app::builder::BuildError;
use crate::config::ConfigError;
use crate::domain::StoreError;
use crate::typed::{CodecError, RegistryError};

#[derive(Debug, Error)]
pub enum SpindleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),
}

impl SpindleError {
    /// True when the backing store failed (as opposed to a setup mistake).
    pub fn is_store(&self) -> bool {
        matches!(self, SpindleError::Store(_))
    }
}
