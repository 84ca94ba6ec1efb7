//! Errors generated by document caches.
use thiserror::Error;

use crate::error::IoError;

/// Errors raised by a document cache.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    /// Insert without replacement collided with an existing document.
    #[error("Cache already contains a document named '{0}'")]
    KeyExists(String),
    /// Failure in a backing store.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Io(err))
    }
}
