//! Error taxonomy for tool acquisition and invocation.
//!
//! Failures that happen before a process is spawned (resolution, download,
//! verification, extraction) surface as `ToolError`. Failures of the spawned
//! process itself never do; they are carried inside
//! [`CliExitData`](crate::executor::CliExitData) so callers can branch on
//! exit status, stdout, and stderr independently.

use thiserror::Error;

/// Errors raised while resolving, acquiring, or preparing a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool is absent from both the search path and the registry.
    #[error("tool '{0}' is not available")]
    NotFound(String),

    /// The user declined to download and install the tool.
    #[error("download of '{0}' was cancelled by the user")]
    UserCancelled(String),

    /// The downloaded file's digest does not match the registry checksum.
    #[error("checksum mismatch for '{tool}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        tool: String,
        expected: String,
        actual: String,
    },

    /// The downloaded file has a suffix no extraction strategy handles.
    #[error("unsupported archive format for '{path}'")]
    UnsupportedArchive { path: String },

    /// Transport-level download failure.
    #[error("download failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("download failed with HTTP status {0}")]
    HttpStatus(u16),

    /// The download URL was rejected before any request was made.
    #[error("download rejected: {0}")]
    InvalidUrl(String),

    /// An in-flight download was cancelled through its cancellation token.
    #[error("download cancelled")]
    Cancelled,

    /// A registry entry failed load-time validation.
    #[error("invalid registry entry for '{tool}': {reason}")]
    Registry { tool: String, reason: String },

    /// Archive decompression failed.
    #[error("extraction failed for '{path}': {reason}")]
    Extract { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
