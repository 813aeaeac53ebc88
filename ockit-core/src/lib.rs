//! ockit Core Library
//!
//! This crate provides the core functionality for ockit, a toolkit for
//! acquiring and driving OpenShift command-line tools. It includes:
//!
//! - Typed registry of supported tools with per-platform download metadata
//! - Streaming downloader with progress reporting and cancellation
//! - SHA-256 integrity verification of downloaded artifacts
//! - Archive extraction (.tar.gz, .gz, .zip) with prefix stripping
//! - Tool resolution (search path, managed copy, download-and-install)
//! - Structured command building with privacy-aware rendering
//! - Subprocess execution with output capture and timeouts

pub mod command;
pub mod download;
pub mod error;
pub mod executor;
pub mod extract;
pub mod paths;
pub mod platform;
pub mod registry;
pub mod resolver;
pub mod verify;

#[cfg(test)]
mod testutil;

// Re-exports for convenience
pub use error::ToolError;
pub use platform::Platform;

// Re-export registry types
pub use registry::{resolve_for_platform, ToolDescriptor, ToolEntry, REGISTRY};

// Re-export download types
pub use download::{download_file, DownloadProgress};

// Re-export resolution
pub use resolver::{DownloadConsent, InstallPrompt, RetryChoice, ToolResolver, HELP_URL};

// Re-export command building
pub use command::{with_verbosity, Command, CommandOption, CommandText, REDACTED};

// Re-export execution
pub use executor::{Cli, CliExitData, ExecOptions, ExitError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
