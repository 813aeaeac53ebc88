//! Integrity verification for downloaded files.
//!
//! Computes streaming SHA-256 digests and compares them against registry
//! checksums. An empty expected checksum means the registry has no known
//! digest for the artifact and verification is skipped.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::ToolError;

/// Computes the SHA-256 digest of a file as a lowercase hex string.
pub async fn sha256_digest(path: &Path) -> Result<String, ToolError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = to_hex(&hasher.finalize());
    debug!(path = %path.display(), %digest, "computed file digest");
    Ok(digest)
}

/// Compares a computed digest against an expected checksum.
///
/// Comparison is case-insensitive; an empty expected value always matches.
pub fn checksum_matches(actual: &str, expected: &str) -> bool {
    expected.is_empty() || actual.eq_ignore_ascii_case(expected)
}

/// Formats a digest as lowercase hex.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
