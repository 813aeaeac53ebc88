//! Managed-directory path resolution.
//!
//! Downloaded tool binaries live in a directory owned by this crate,
//! separate from the OS search path:
//!
//! - Linux/macOS: `~/.ockit/tools/`
//! - Windows: `C:\Users\<User>\.ockit\tools\`
//!
//! If no home directory can be determined the OS temp directory is used
//! instead, so acquisition still works in stripped-down environments.

use std::path::PathBuf;

use crate::error::ToolError;

/// Directory name under the user's home directory.
const ROOT_DIR_NAME: &str = ".ockit";

/// Returns the base ockit directory.
pub fn root_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(ROOT_DIR_NAME)
}

/// Returns the managed directory for downloaded tool binaries.
///
/// Path: `{root}/tools/`
pub fn tools_dir() -> PathBuf {
    root_dir().join("tools")
}

/// Creates the managed directories if they do not exist yet.
pub fn ensure_dirs_exist() -> Result<(), ToolError> {
    std::fs::create_dir_all(tools_dir())?;
    Ok(())
}
