//! Error types and handling for xmlsitemap-core operations.
//!
//! Errors are grouped by the part of the pipeline that raised them so callers
//! can decide what to do with a failed batch step:
//!
//! - **Invalid links**: a link projection produced a record that breaks the
//!   link invariants. Fatal for that single link.
//! - **I/O and generation errors**: a chunk or index file could not be
//!   written. Fatal for the current run; the next scheduled trigger retries.
//! - **Storage errors**: the link table, sitemap repository or state file
//!   could not be read or persisted.
//! - **Configuration errors**: invalid or unreadable settings.
//!
//! ## Recovery Hints
//!
//! ```rust
//! use xmlsitemap_core::{Error, Result};
//!
//! fn run_step() -> Result<()> { Ok(()) }
//!
//! match run_step() {
//!     Err(e) if e.is_recoverable() => println!("will retry on next cron run: {e}"),
//!     Err(e) => println!("{} failure: {e}", e.category()),
//!     Ok(()) => {},
//! }
//! ```

use thiserror::Error;

/// The main error type for xmlsitemap-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading and writing chunk files, state files and the link table
    /// snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A link record violates the link invariants.
    ///
    /// Raised by `LinkStore::save` for a `loc` without a leading slash, a
    /// priority outside `0.0..=1.0` or a negative change count. These point at
    /// a bug in the projection that built the link, not at bad user input, so
    /// the value is never coerced.
    #[error("Invalid link {kind}/{id}: {reason}")]
    InvalidLink {
        /// Link type of the offending record.
        kind: String,
        /// Identifier of the offending record.
        id: String,
        /// Which invariant was broken.
        reason: String,
    },

    /// Sitemap generation failed.
    ///
    /// The run is abandoned; published files and the regeneration flag are
    /// left as they were.
    #[error("Generation error: {0}")]
    Generation(String),

    /// XML could not be written.
    #[error("XML error: {0}")]
    Xml(String),

    /// Storage operation failed.
    ///
    /// Covers the link table, the sitemap repository and the state store
    /// beyond plain file I/O.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

impl Error {
    /// Build an [`Error::InvalidLink`] for the given link identity.
    pub fn invalid_link(kind: &str, id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLink {
            kind: kind.to_string(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if the error might go away when the step is retried.
    ///
    /// Interrupted or timed-out I/O is transient. Everything else needs a
    /// change in data or configuration first.
    ///
    /// ```rust
    /// use xmlsitemap_core::Error;
    /// use std::io;
    ///
    /// assert!(Error::Io(io::Error::new(io::ErrorKind::Interrupted, "eintr")).is_recoverable());
    /// assert!(!Error::Config("chunk_size must be positive".into()).is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidLink { .. } => "invalid_link",
            Self::Generation(_) => "generation",
            Self::Xml(_) => "xml",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
