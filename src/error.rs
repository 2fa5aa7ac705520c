//! Error types for the ring cache

use thiserror::Error;

/// Result type alias for ring cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for opening and operating a [`crate::RingCache`]
#[derive(Error, Debug)]
pub enum CacheError {
    /// The source reported a zero or unknown size at Open; the filter
    /// cannot be installed over a source it can't size.
    #[error("source reports zero or unknown size")]
    UnknownSize,

    /// Configuration disabled the filter.
    #[error("filter is disabled by configuration")]
    Disabled,

    /// The producer thread could not be spawned.
    #[error("failed to spawn producer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The source failed to seek during long-seek resolution.
    #[error("source seek failed: {0}")]
    SourceSeek(#[source] std::io::Error),

    /// The source failed to read.
    #[error("source read failed: {0}")]
    SourceRead(#[source] std::io::Error),

    /// `set_position` was called on a source that is not seekable.
    #[error("set_position requires a seekable source")]
    NotSeekable,

    /// An invalid configuration was supplied, e.g. a block layout that
    /// leaves no room for `RW_GAP + SEEK_GAP`.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration problem.
        message: String,
    },
}

impl CacheError {
    /// Build an [`CacheError::InvalidConfig`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// True if this error reflects a setup-time condition (`Open` failed)
    /// rather than a runtime failure surfaced to a blocked consumer.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSize | Self::Disabled | Self::Spawn(_) | Self::NotSeekable | Self::InvalidConfig { .. }
        )
    }
}
