//! Streaming file downloads with progress reporting and cancellation.
//!
//! Downloads are validated (HTTPS, allowed domains), streamed chunk by chunk
//! to the destination file, and can be aborted at any point through a
//! [`CancellationToken`]. Partial files are left on disk after a failure;
//! callers decide whether to remove them.

use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::error::ToolError;

/// Allowed domains for tool downloads.
const ALLOWED_DOMAINS: &[&str] = &["github.com"];

/// Progress information during a download.
#[derive(Debug, Clone, Copy)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected, if the Content-Length header was present.
    pub total_bytes: Option<u64>,
    /// Whole-percent progress, or `None` when the total is unknown.
    pub percent: Option<u8>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.filter(|t| *t > 0).map(|total| {
            let pct = bytes_downloaded.saturating_mul(100) / total;
            pct.min(100) as u8
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

/// Validates that a URL is acceptable for downloading.
///
/// HTTPS from an allowed domain is required; plain HTTP is accepted only for
/// loopback hosts so fixture servers can be used in tests.
fn validate_url(url_str: &str) -> Result<Url, ToolError> {
    let url = Url::parse(url_str)
        .map_err(|e| ToolError::InvalidUrl(format!("invalid URL '{url_str}': {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| ToolError::InvalidUrl(format!("URL has no host: {url_str}")))?;

    let loopback = host == "localhost" || host.starts_with("127.");
    if url.scheme() != "https" && !loopback {
        return Err(ToolError::InvalidUrl(format!("URL must use HTTPS: {url_str}")));
    }

    let allowed = loopback
        || ALLOWED_DOMAINS
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")));
    if !allowed {
        return Err(ToolError::InvalidUrl(format!(
            "download domain not allowed: {host}"
        )));
    }

    Ok(url)
}

/// Downloads a file with streaming, progress reporting, and cancellation.
///
/// `progress_cb` is invoked once up front and then whenever the whole-percent
/// value advances (on every chunk when the total size is unknown).
///
/// Returns the number of bytes written. On failure the partially written
/// destination file is left in place.
pub async fn download_file<F>(
    url: &str,
    dest: &Path,
    cancel: &CancellationToken,
    progress_cb: F,
) -> Result<u64, ToolError>
where
    F: Fn(DownloadProgress),
{
    info!(url, dest = %dest.display(), "starting download");
    validate_url(url)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::HttpStatus(status.as_u16()));
    }

    let total_bytes = response.content_length();
    debug!(?total_bytes, "download response headers received");

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;
    let mut last_percent: Option<u8> = None;

    progress_cb(DownloadProgress::new(0, total_bytes));

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
            next = stream.next() => match next {
                Some(chunk) => chunk?,
                None => break,
            },
        };

        file.write_all(&chunk).await?;
        bytes_downloaded += chunk.len() as u64;

        let progress = DownloadProgress::new(bytes_downloaded, total_bytes);
        if progress.percent.is_none() || progress.percent != last_percent {
            last_percent = progress.percent;
            progress_cb(progress);
        }
    }

    file.flush().await?;
    info!(bytes_downloaded, dest = %dest.display(), "download complete");
    Ok(bytes_downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::serve_fixture;
    use tempfile::TempDir;

    #[test]
    fn https_is_required_for_remote_hosts() {
        assert!(validate_url("http://github.com/file.zip").is_err());
        assert!(validate_url("https://github.com/file.zip").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/file.zip").is_ok());
    }

    #[test]
    fn disallowed_domains_are_rejected() {
        assert!(validate_url("https://example.com/file.zip").is_err());
        assert!(validate_url("https://github.com.evil.org/file.zip").is_err());
        assert!(validate_url("not-a-url").is_err());
    }

    #[test]
    fn progress_percent_is_clamped() {
        assert_eq!(DownloadProgress::new(50, Some(100)).percent, Some(50));
        assert_eq!(DownloadProgress::new(150, Some(100)).percent, Some(100));
        assert_eq!(DownloadProgress::new(50, None).percent, None);
        assert_eq!(DownloadProgress::new(0, Some(0)).percent, None);
    }

    #[tokio::test]
    async fn downloads_fixture_and_reports_progress() {
        let body = vec![7u8; 4096];
        let url = serve_fixture(body.clone(), "fixture.bin").await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("fixture.bin");
        let seen = std::sync::Mutex::new(Vec::new());

        let written = download_file(&url, &dest, &CancellationToken::new(), |p| {
            seen.lock().unwrap().push(p.percent);
        })
        .await
        .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen.first().unwrap(), Some(0));
        assert_eq!(*seen.last().unwrap(), Some(100));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_download() {
        let url = serve_fixture(vec![1u8; 128], "fixture.bin").await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("fixture.bin");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = download_file(&url, &dest, &cancel, |_| {}).await.unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }
}
