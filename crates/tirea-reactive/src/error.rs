//! Error types for tirea-reactive operations.

use crate::{Key, Path};
use thiserror::Error;

/// Result type alias for tirea-reactive operations.
pub type ReactiveResult<T> = Result<T, ReactiveError>;

/// Errors that can occur while buffering or committing writes.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// An intermediate node on a write path is missing or is not a container.
    #[error("cannot write {path}: {found} at {at} cannot be descended into")]
    PathTraversal {
        /// The full path of the write.
        path: Path,
        /// The prefix where traversal stopped.
        at: Path,
        /// What was found there ("missing" when the key is absent).
        found: &'static str,
    },

    /// A key that cannot address the container it is applied to.
    #[error("cannot write {path}: key {key} does not address the {container} at {at}")]
    KeyMismatch {
        /// The full path of the write.
        path: Path,
        /// The path of the container.
        at: Path,
        /// The offending key.
        key: Key,
        /// Kind of the container.
        container: &'static str,
    },

    /// Writes must target a location below the root.
    #[error("write path must not be empty")]
    EmptyPath,

    /// Array method name that the emulation does not recognize.
    #[error("unknown array method: {name}")]
    UnknownArrayMethod {
        /// The name that was requested.
        name: String,
    },

    /// Invalid argument passed to a dynamic call.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what went wrong.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReactiveError {
    /// Create a path traversal error.
    #[inline]
    pub fn path_traversal(path: &Path, depth: usize, found: &'static str) -> Self {
        ReactiveError::PathTraversal {
            path: path.clone(),
            at: path.prefix(depth),
            found,
        }
    }

    /// Create a key mismatch error.
    #[inline]
    pub fn key_mismatch(path: &Path, depth: usize, container: &'static str) -> Self {
        ReactiveError::KeyMismatch {
            path: path.clone(),
            at: path.prefix(depth),
            key: path[depth].clone(),
            container,
        }
    }

    /// Create an unknown array method error.
    #[inline]
    pub fn unknown_array_method(name: impl Into<String>) -> Self {
        ReactiveError::UnknownArrayMethod { name: name.into() }
    }

    /// Create an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ReactiveError::InvalidArgument {
            message: message.into(),
        }
    }

    /// The write path this error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ReactiveError::PathTraversal { path, .. } | ReactiveError::KeyMismatch { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}
