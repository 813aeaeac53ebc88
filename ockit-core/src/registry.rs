//! Static tool registry with per-platform download variants.
//!
//! Each registry entry carries generic metadata plus a map of platform
//! variants. [`resolve_for_platform`] collapses that map once at load time:
//! the current platform's variant is merged (shallow override) onto the
//! generic fields, and tools without a variant for the platform are removed
//! entirely. Resolved descriptors never carry the raw platform map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;
use crate::platform::Platform;

// ============================================================================
// Raw Registry Types
// ============================================================================

/// A platform-specific download variant. Any `None` field falls back to the
/// generic value on the owning [`ToolEntry`].
#[derive(Debug, Clone, Copy)]
pub struct PlatformVariant {
    /// The download URL.
    pub url: &'static str,
    /// Expected SHA-256 hex digest; empty string means "skip verification".
    pub sha256: &'static str,
    /// File name the artifact is saved under before extraction.
    pub download_file_name: Option<&'static str>,
    /// File name of the installed executable.
    pub command_file_name: Option<&'static str>,
    /// Leading path segment stripped from every tar entry on extraction.
    pub archive_prefix: Option<&'static str>,
}

/// A raw registry entry before platform resolution.
#[derive(Debug, Clone, Copy)]
pub struct ToolEntry {
    /// The command name this entry is looked up under.
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub vendor: &'static str,
    pub version: &'static str,
    pub download_file_name: Option<&'static str>,
    pub command_file_name: Option<&'static str>,
    pub archive_prefix: Option<&'static str>,
    /// Generic download location, used only by entries without variants.
    pub url: Option<&'static str>,
    pub sha256: Option<&'static str>,
    /// Per-platform overrides. Empty means the entry applies everywhere.
    pub platforms: &'static [(Platform, PlatformVariant)],
}

// ============================================================================
// Resolved Descriptor
// ============================================================================

/// A tool descriptor after platform resolution: exactly one merged variant,
/// no residual platform map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub vendor: String,
    pub version: String,
    pub url: String,
    /// SHA-256 hex digest of the download; empty skips verification.
    pub sha256: String,
    pub download_file_name: String,
    pub command_file_name: String,
    /// Leading tar entry prefix to strip; empty strips nothing.
    pub archive_prefix: String,
}

// ============================================================================
// Platform Resolution
// ============================================================================

/// Resolves a raw registry against one platform.
///
/// Pure and deterministic: entries whose variant map lacks `platform` are
/// dropped, all others are merged down to a single [`ToolDescriptor`].
/// Entries missing a url, download file name, or command file name after the
/// merge fail fast with [`ToolError::Registry`].
pub fn resolve_for_platform(
    entries: &[ToolEntry],
    platform: Platform,
) -> Result<BTreeMap<String, ToolDescriptor>, ToolError> {
    let mut resolved = BTreeMap::new();

    for entry in entries {
        let variant = if entry.platforms.is_empty() {
            None
        } else {
            match entry.platforms.iter().find(|(p, _)| *p == platform) {
                Some((_, v)) => Some(v),
                None => {
                    debug!(tool = entry.key, %platform, "no variant for platform, dropping tool");
                    continue;
                }
            }
        };

        let descriptor = merge_entry(entry, variant, platform)?;
        resolved.insert(entry.key.to_string(), descriptor);
    }

    Ok(resolved)
}

fn merge_entry(
    entry: &ToolEntry,
    variant: Option<&PlatformVariant>,
    platform: Platform,
) -> Result<ToolDescriptor, ToolError> {
    let invalid = |reason: &str| ToolError::Registry {
        tool: entry.key.to_string(),
        reason: format!("{reason} (platform {platform})"),
    };

    let url = variant
        .map(|v| v.url)
        .or(entry.url)
        .ok_or_else(|| invalid("missing download url"))?;
    let sha256 = variant
        .map(|v| v.sha256)
        .or(entry.sha256)
        .unwrap_or_default();
    let download_file_name = variant
        .and_then(|v| v.download_file_name)
        .or(entry.download_file_name)
        .ok_or_else(|| invalid("missing download file name"))?;
    let command_file_name = variant
        .and_then(|v| v.command_file_name)
        .or(entry.command_file_name)
        .ok_or_else(|| invalid("missing command file name"))?;
    let archive_prefix = variant
        .and_then(|v| v.archive_prefix)
        .or(entry.archive_prefix)
        .unwrap_or_default();

    Ok(ToolDescriptor {
        name: entry.name.to_string(),
        description: entry.description.to_string(),
        vendor: entry.vendor.to_string(),
        version: entry.version.to_string(),
        url: url.to_string(),
        sha256: sha256.to_string(),
        download_file_name: download_file_name.to_string(),
        command_file_name: command_file_name.to_string(),
        archive_prefix: archive_prefix.to_string(),
    })
}

// ============================================================================
// Built-in Catalog
// ============================================================================

const ODO: ToolEntry = ToolEntry {
    key: "odo",
    name: "odo",
    description: "OpenShift Do CLI tool",
    vendor: "Red Hat, Inc.",
    version: "0.0.12",
    download_file_name: Some("odo"),
    command_file_name: Some("odo"),
    archive_prefix: None,
    url: None,
    sha256: None,
    platforms: &[
        (
            Platform::Win32,
            PlatformVariant {
                url: "https://github.com/redhat-developer/odo/releases/download/v0.0.12/odo-windows-amd64.exe.gz",
                sha256: "4f7719ef1f11aac22474d36608996b016305c65afb6e9e3dcd4361c43fb54be1",
                download_file_name: Some("odo-windows-amd64.exe.gz"),
                command_file_name: Some("odo.exe"),
                archive_prefix: None,
            },
        ),
        (
            Platform::Darwin,
            PlatformVariant {
                url: "https://github.com/redhat-developer/odo/releases/download/v0.0.12/odo-darwin-amd64.gz",
                sha256: "3b77cf5d2a79f7484617715271b9f3c8da4a6e85afdf63f075ad09062f007861",
                download_file_name: Some("odo-darwin-amd64.gz"),
                command_file_name: None,
                archive_prefix: None,
            },
        ),
        (
            Platform::Linux,
            PlatformVariant {
                url: "https://github.com/redhat-developer/odo/releases/download/v0.0.12/odo-linux-amd64.gz",
                sha256: "848dae9a3ad109a6dc0f305c890dd1edba1c3b704e8e163285047d93d9f58062",
                download_file_name: Some("odo-linux-amd64.gz"),
                command_file_name: None,
                archive_prefix: None,
            },
        ),
    ],
};

const OC: ToolEntry = ToolEntry {
    key: "oc",
    name: "oc",
    description: "OKD CLI client tool",
    vendor: "Red Hat, Inc.",
    version: "0.0.10",
    download_file_name: None,
    command_file_name: Some("oc"),
    archive_prefix: None,
    url: None,
    sha256: None,
    platforms: &[
        (
            Platform::Win32,
            PlatformVariant {
                url: "https://github.com/openshift/origin/releases/download/v3.10.0/openshift-origin-client-tools-v3.10.0-dd10d17-windows.zip",
                sha256: "",
                download_file_name: Some("oc.zip"),
                command_file_name: Some("oc.exe"),
                archive_prefix: None,
            },
        ),
        (
            Platform::Darwin,
            PlatformVariant {
                url: "https://github.com/openshift/origin/releases/download/v3.10.0/openshift-origin-client-tools-v3.10.0-dd10d17-mac.zip",
                sha256: "",
                download_file_name: Some("oc.zip"),
                command_file_name: None,
                archive_prefix: None,
            },
        ),
        (
            Platform::Linux,
            PlatformVariant {
                url: "https://github.com/openshift/origin/releases/download/v3.10.0/openshift-origin-client-tools-v3.10.0-dd10d17-linux-64bit.tar.gz",
                sha256: "",
                download_file_name: Some("oc.tar.gz"),
                command_file_name: None,
                archive_prefix: Some("openshift-origin-client-tools-v3.10.0-dd10d17-linux-64bit/"),
            },
        ),
    ],
};

/// The built-in tool registry.
pub const REGISTRY: &[ToolEntry] = &[ODO, OC];
