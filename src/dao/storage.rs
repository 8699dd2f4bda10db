use std::{error::Error, future::Future, time::Duration};

use thiserror::Error;
use tokio::time::timeout;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Upper bound for one storage call made by a command or a periodic task.
pub const STORAGE_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the request.
    #[error("{backend} storage unavailable: {message}")]
    Unavailable {
        /// Backend name, as selected by `STORAGE_BACKEND`.
        backend: &'static str,
        /// Human readable summary of the failure.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend did not answer in time.
    #[error("storage call `{operation}` got no answer within {after:?}")]
    Timeout {
        /// Store operation that was abandoned.
        operation: &'static str,
        /// Deadline that elapsed.
        after: Duration,
    },
}

impl StorageError {
    /// Wrap a failure of `backend`, keeping its message for logs.
    pub fn unavailable<E>(backend: &'static str, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        StorageError::Unavailable {
            backend,
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    /// Backend that raised the error, when it answered at all.
    pub fn backend(&self) -> Option<&'static str> {
        match self {
            StorageError::Unavailable { backend, .. } => Some(backend),
            StorageError::Timeout { .. } => None,
        }
    }
}

/// Await `call`, giving up with [`StorageError::Timeout`] once `limit` elapses.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout {
            operation,
            after: limit,
        }),
    }
}
