//! Error types for the tierfs storage abstraction.

/// Boxed error produced by a backend adapter.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Storage error type with contextual variants.
///
/// `NotFound` is kept distinct from every other failure: the cache layer
/// branches on it to tell a miss apart from a broken tier, and callers use it
/// to tell "absent" apart from "failed".
///
/// # Examples
///
/// ```rust
/// use tierfs::FsError;
///
/// let err = FsError::NotFound { path: "reports/2024.csv".into() };
/// assert!(err.is_not_found());
/// assert_eq!(err.to_string(), "not found: reports/2024.csv");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: String,
    },

    /// A deadline attached to the call's [`Context`](crate::Context) passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The call's [`Context`](crate::Context) was cancelled by the caller.
    #[error("context cancelled")]
    Cancelled,

    /// Operation is not supported by this backend.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// The path cannot be addressed by this backend.
    #[error("invalid path: {path} ({reason})")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// Backend failure with operation and path context.
    #[error("{operation} failed for {path}: {source}")]
    Backend {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: String,
        /// The underlying adapter error.
        #[source]
        source: BoxError,
    },

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl FsError {
    /// Wrap an adapter failure with the operation and path it concerns.
    pub fn backend(operation: &'static str, path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        FsError::Backend {
            operation,
            path: path.into(),
            source: source.into(),
        }
    }

    /// Map an I/O error for `path`, keeping "not present" distinguishable.
    pub fn io(operation: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound { path },
            _ => FsError::Io {
                operation,
                path,
                source,
            },
        }
    }

    /// Returns `true` if the addressed path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }

    /// Returns `true` if the call was cut short by a deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FsError::DeadlineExceeded)
    }

    /// Returns `true` for deadline or caller cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FsError::DeadlineExceeded | FsError::Cancelled)
    }
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        FsError::io("io", String::new(), error)
    }
}
