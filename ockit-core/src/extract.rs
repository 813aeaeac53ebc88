//! Archive extraction for downloaded tool artifacts.
//!
//! Dispatch is purely suffix-based and checked in order: `.tar.gz` first,
//! then `.gz`, then `.zip`. Anything else is rejected with an error naming
//! the offending path. The tar strategy strips a configured leading prefix
//! from every entry name, for upstream archives that wrap their content in a
//! version-specific top-level directory.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::error::ToolError;

type Strategy = fn(&Path, &Path, &str) -> Result<(), ToolError>;

/// Suffix dispatch table; first match wins, so `.tar.gz` shadows `.gz`.
const STRATEGIES: &[(&str, Strategy)] = &[
    (".tar.gz", untar_gz),
    (".gz", gunzip),
    (".zip", unzip),
];

/// Extracts `source` according to its file suffix.
///
/// For `.gz` the destination is the output file path; for `.tar.gz` and
/// `.zip` it is the directory to extract into. `prefix` only affects the tar
/// strategy.
pub fn extract(source: &Path, destination: &Path, prefix: &str) -> Result<(), ToolError> {
    let name = source.to_string_lossy();
    for (suffix, strategy) in STRATEGIES {
        if name.ends_with(suffix) {
            info!(source = %name, destination = %destination.display(), suffix, "extracting archive");
            return strategy(source, destination, prefix);
        }
    }
    Err(ToolError::UnsupportedArchive {
        path: name.into_owned(),
    })
}

// ============================================================================
// Strategies
// ============================================================================

/// Decompresses a single gzip file to `destination`.
fn gunzip(source: &Path, destination: &Path, _prefix: &str) -> Result<(), ToolError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut decoder = GzDecoder::new(BufReader::new(File::open(source)?));
    let mut out = File::create(destination)?;
    io::copy(&mut decoder, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Unpacks a gzip-compressed tar archive into the `destination` directory,
/// stripping `prefix` from every entry name that starts with it.
fn untar_gz(source: &Path, destination: &Path, prefix: &str) -> Result<(), ToolError> {
    fs::create_dir_all(destination)?;

    let decoder = GzDecoder::new(BufReader::new(File::open(source)?));
    let mut archive = tar::Archive::new(decoder);

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_type = entry.header().entry_type();

        // Links can escape the destination directory; never materialize them.
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            warn!("skipping link entry in tar archive");
            continue;
        }

        let raw_path = entry.path()?.to_string_lossy().into_owned();
        let stripped = raw_path.strip_prefix(prefix).unwrap_or(&raw_path);
        if stripped.is_empty() {
            continue;
        }

        let rel = Path::new(stripped);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| c == std::path::Component::ParentDir)
        {
            warn!(entry = %raw_path, "skipping unsafe path in tar archive");
            continue;
        }

        let dest_path = destination.join(rel);
        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest_path)?;
            io::copy(&mut entry, &mut out)?;
            out.flush()?;

            #[cfg(unix)]
            if let Ok(mode) = entry.header().mode() {
                set_unix_permissions(&dest_path, Some(mode))?;
            }
        }
    }

    debug!("tar extraction complete");
    Ok(())
}

/// Extracts a zip archive into the `destination` directory.
fn unzip(source: &Path, destination: &Path, _prefix: &str) -> Result<(), ToolError> {
    fs::create_dir_all(destination)?;

    let extract_err = |e: zip::result::ZipError| ToolError::Extract {
        path: source.display().to_string(),
        reason: e.to_string(),
    };

    let file = File::open(source)?;
    let mut archive = zip::ZipArchive::new(file).map_err(extract_err)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(extract_err)?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                warn!("skipping unsafe path in zip archive");
                continue;
            }
        };

        let dest_path = destination.join(&entry_path);
        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest_path)?;
            io::copy(&mut entry, &mut out)?;

            #[cfg(unix)]
            set_unix_permissions(&dest_path, entry.unix_mode())?;
        }
    }

    debug!("zip extraction complete");
    Ok(())
}

// ============================================================================
// Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<(), ToolError> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o755))?;
        }
    }
    Ok(())
}

/// Sets the executable bit on a file. No-op on Windows.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<(), ToolError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;
        debug!(path = %path.display(), "set executable permission");
    }
    Ok(())
}
