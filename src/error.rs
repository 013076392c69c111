//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while the
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level error enum for the store, index and scan engine
//! - Module-specific errors ([`SearchError`], [`TagError`]) for detailed handling
//! - [`Error::NotFound`] is kept apart from storage/decoding failures so
//!   callers can treat an absent key as a normal outcome
//!
//! [`SearchError`]: crate::search::SearchError
//! [`TagError`]: crate::metadata::TagError

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ordered store error (open, transaction, table or commit failure)
    #[error("Store error: {0}")]
    Store(#[from] redb::Error),

    /// A stored value could not be encoded or decoded
    #[error("Record encoding error for {key}: {source}")]
    Encoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Point lookup on a key that does not exist
    #[error("Not found: {key}")]
    NotFound { key: String },

    /// The source directory could not be listed; aborts the whole scan
    #[error("Cannot read source directory {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Track number does not fit the fixed-width sort key
    #[error("Track number {0} exceeds the supported maximum of 999999")]
    TrackNumberOutOfRange(u32),

    /// The store file is held open by another process
    #[error("Index at {path} is in use by another process")]
    StoreLocked { path: PathBuf },

    /// Background task failed to complete
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not found error for a store key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an encoding error for a store key.
    pub fn encoding(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encoding {
            key: key.into(),
            source,
        }
    }

    /// Whether this error (or the error it wraps) is a missing key.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether the store could not be opened because another process holds it.
    pub fn is_store_locked(&self) -> bool {
        match self {
            Self::StoreLocked { .. } => true,
            Self::WithContext { source, .. } => source.is_store_locked(),
            _ => false,
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

// redb reports each stage with its own error type; fold them into one variant.
macro_rules! store_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(err: $ty) -> Self {
                    Error::Store(err.into())
                }
            }
        )*
    };
}

store_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}
