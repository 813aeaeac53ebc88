//! Tool resolution: search path, managed copy, or download-and-install.
//!
//! A resolution request walks a fixed sequence: the OS search path first,
//! then the managed local copy, and only then the acquisition flow (consent
//! prompt, download, checksum verification with a re-download loop on
//! mismatch, extraction, executable permission). Concurrent requests for
//! the same tool serialize on a per-tool lock so only one acquisition is in
//! flight; later callers find the installed copy.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::download::{download_file, DownloadProgress};
use crate::error::ToolError;
use crate::extract;
use crate::paths;
use crate::platform::Platform;
use crate::registry::{self, ToolDescriptor};
use crate::verify;

/// Documentation opened when the user picks "Help" at the consent prompt.
pub const HELP_URL: &str = "https://github.com/ockit/ockit#dependencies";

// ============================================================================
// Consent Prompt
// ============================================================================

/// User response to the download-consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadConsent {
    Download,
    Help,
    Cancel,
}

/// User response after a checksum mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryChoice {
    DownloadAgain,
    Cancel,
}

/// Interactive seam between the resolver and its caller.
///
/// The resolver never talks to a UI directly; whoever drives it decides how
/// consent questions are presented and how progress is shown.
#[async_trait]
pub trait InstallPrompt: Send + Sync {
    /// Asks whether a missing tool should be downloaded and installed.
    async fn confirm_download(&self, tool: &ToolDescriptor) -> DownloadConsent;

    /// Asks whether a download whose checksum did not match should be
    /// retried.
    async fn confirm_redownload(&self, tool: &ToolDescriptor) -> RetryChoice;

    /// Receives download progress updates.
    fn report_progress(&self, _tool: &ToolDescriptor, _progress: &DownloadProgress) {}

    /// Opens the dependency documentation after the user picks Help. The
    /// default implementation hands the URL to the system browser.
    fn open_help(&self, url: &str) {
        if let Err(e) = webbrowser::open(url) {
            warn!(error = %e, "failed to open help page");
        }
    }
}

// ============================================================================
// Tool Resolver
// ============================================================================

/// Resolves logical command names to executable paths, acquiring missing
/// tools on demand.
pub struct ToolResolver {
    tools: BTreeMap<String, ToolDescriptor>,
    root: PathBuf,
    prompt: Arc<dyn InstallPrompt>,
    cancel: CancellationToken,
    /// One lock per tool so concurrent resolutions of the same tool share a
    /// single in-flight acquisition.
    acquisitions: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ToolResolver {
    /// Creates a resolver over the built-in registry, resolved for the
    /// current platform. On an unsupported platform the registry is empty
    /// and only search-path tools resolve.
    pub fn new(prompt: Arc<dyn InstallPrompt>) -> Result<Self, ToolError> {
        let tools = match Platform::detect() {
            Some(platform) => registry::resolve_for_platform(registry::REGISTRY, platform)?,
            None => BTreeMap::new(),
        };
        paths::ensure_dirs_exist()?;
        Ok(Self::with_tools(tools, paths::tools_dir(), prompt))
    }

    /// Creates a resolver over an explicit descriptor set and managed root.
    pub fn with_tools(
        tools: BTreeMap<String, ToolDescriptor>,
        root: PathBuf,
        prompt: Arc<dyn InstallPrompt>,
    ) -> Self {
        Self {
            tools,
            root,
            prompt,
            cancel: CancellationToken::new(),
            acquisitions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a handle that aborts in-flight downloads when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the platform-resolved descriptors this resolver serves.
    pub fn tools(&self) -> &BTreeMap<String, ToolDescriptor> {
        &self.tools
    }

    /// Resolves a command name to an executable path.
    ///
    /// Returns the bare name when the OS search path already resolves it,
    /// the managed path when a local copy exists, and otherwise runs the
    /// acquisition flow.
    pub async fn locate(&self, tool_name: &str) -> Result<PathBuf, ToolError> {
        if which::which(tool_name).is_ok() {
            debug!(tool = tool_name, "found on search path");
            return Ok(PathBuf::from(tool_name));
        }

        let descriptor = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;
        let command_path = self.root.join(&descriptor.command_file_name);
        if command_path.exists() {
            debug!(tool = tool_name, path = %command_path.display(), "found managed copy");
            return Ok(command_path);
        }

        let lock = self.acquisition_lock(tool_name).await;
        let _guard = lock.lock().await;
        if command_path.exists() {
            // Another caller finished the acquisition while we waited.
            return Ok(command_path);
        }

        self.acquire(tool_name, descriptor, &command_path).await?;
        Ok(command_path)
    }

    async fn acquisition_lock(&self, tool_name: &str) -> Arc<Mutex<()>> {
        let mut acquisitions = self.acquisitions.lock().await;
        acquisitions
            .entry(tool_name.to_string())
            .or_default()
            .clone()
    }

    async fn acquire(
        &self,
        tool_name: &str,
        descriptor: &ToolDescriptor,
        command_path: &Path,
    ) -> Result<(), ToolError> {
        match self.prompt.confirm_download(descriptor).await {
            DownloadConsent::Download => {}
            DownloadConsent::Help => {
                self.prompt.open_help(HELP_URL);
                return Err(ToolError::UserCancelled(tool_name.to_string()));
            }
            DownloadConsent::Cancel => {
                info!(tool = tool_name, "user declined download");
                return Err(ToolError::UserCancelled(tool_name.to_string()));
            }
        }

        std::fs::create_dir_all(&self.root)?;
        let download_path = self.root.join(&descriptor.download_file_name);

        self.download_verified(tool_name, descriptor, &download_path)
            .await?;
        self.install(descriptor, &download_path, command_path)?;

        info!(tool = tool_name, path = %command_path.display(), "tool installed");
        Ok(())
    }

    /// Downloads the artifact, re-prompting and re-downloading while the
    /// checksum does not match. An empty registry checksum skips
    /// verification.
    async fn download_verified(
        &self,
        tool_name: &str,
        descriptor: &ToolDescriptor,
        download_path: &Path,
    ) -> Result<(), ToolError> {
        loop {
            let result = download_file(&descriptor.url, download_path, &self.cancel, |progress| {
                self.prompt.report_progress(descriptor, &progress)
            })
            .await;
            if let Err(e) = result {
                let _ = std::fs::remove_file(download_path);
                return Err(e);
            }

            if descriptor.sha256.is_empty() {
                return Ok(());
            }

            let digest = verify::sha256_digest(download_path).await?;
            if verify::checksum_matches(&digest, &descriptor.sha256) {
                return Ok(());
            }

            warn!(
                tool = tool_name,
                expected = %descriptor.sha256,
                actual = %digest,
                "checksum mismatch, discarding download"
            );
            std::fs::remove_file(download_path)?;

            match self.prompt.confirm_redownload(descriptor).await {
                RetryChoice::DownloadAgain => continue,
                RetryChoice::Cancel => {
                    return Err(ToolError::ChecksumMismatch {
                        tool: tool_name.to_string(),
                        expected: descriptor.sha256.clone(),
                        actual: digest,
                    })
                }
            }
        }
    }

    fn install(
        &self,
        descriptor: &ToolDescriptor,
        download_path: &Path,
        command_path: &Path,
    ) -> Result<(), ToolError> {
        // A bare .gz holds the binary itself and unpacks straight to the
        // command path; real archives unpack into the managed root.
        let file_name = &descriptor.download_file_name;
        let destination = if file_name.ends_with(".gz") && !file_name.ends_with(".tar.gz") {
            command_path.to_path_buf()
        } else {
            self.root.clone()
        };

        extract::extract(download_path, &destination, &descriptor.archive_prefix)?;
        if download_path != command_path {
            let _ = std::fs::remove_file(download_path);
        }

        extract::make_executable(command_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{gz_bytes, serve_fixture, serve_fixture_sequence, tar_gz_bytes};
    use sha2::{Digest, Sha256};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct TestPrompt {
        consent: DownloadConsent,
        confirms: AtomicUsize,
        retries: AtomicUsize,
        retry_limit: usize,
        help_urls: std::sync::Mutex<Vec<String>>,
    }

    impl TestPrompt {
        fn accepting() -> Self {
            Self {
                consent: DownloadConsent::Download,
                confirms: AtomicUsize::new(0),
                retries: AtomicUsize::new(0),
                retry_limit: 0,
                help_urls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn declining() -> Self {
            Self {
                consent: DownloadConsent::Cancel,
                ..Self::accepting()
            }
        }

        fn asking_for_help() -> Self {
            Self {
                consent: DownloadConsent::Help,
                ..Self::accepting()
            }
        }

        fn retrying(limit: usize) -> Self {
            Self {
                retry_limit: limit,
                ..Self::accepting()
            }
        }
    }

    #[async_trait]
    impl InstallPrompt for TestPrompt {
        async fn confirm_download(&self, _tool: &ToolDescriptor) -> DownloadConsent {
            self.confirms.fetch_add(1, Ordering::SeqCst);
            self.consent
        }

        async fn confirm_redownload(&self, _tool: &ToolDescriptor) -> RetryChoice {
            let attempt = self.retries.fetch_add(1, Ordering::SeqCst);
            if attempt < self.retry_limit {
                RetryChoice::DownloadAgain
            } else {
                RetryChoice::Cancel
            }
        }

        fn open_help(&self, url: &str) {
            self.help_urls.lock().unwrap().push(url.to_string());
        }
    }

    fn descriptor(url: &str, sha256: &str, download: &str, command: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: "odotest".into(),
            description: "test tool".into(),
            vendor: "acme".into(),
            version: "0.0.1".into(),
            url: url.into(),
            sha256: sha256.into(),
            download_file_name: download.into(),
            command_file_name: command.into(),
            archive_prefix: String::new(),
        }
    }

    fn resolver_with(
        tool: &str,
        descriptor: ToolDescriptor,
        root: &Path,
        prompt: Arc<TestPrompt>,
    ) -> ToolResolver {
        let mut tools = BTreeMap::new();
        tools.insert(tool.to_string(), descriptor);
        ToolResolver::with_tools(tools, root.to_path_buf(), prompt)
    }

    fn hex_digest(bytes: &[u8]) -> String {
        crate::verify::to_hex(&Sha256::digest(bytes))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn search_path_tool_resolves_to_bare_name() {
        let dir = TempDir::new().unwrap();
        let resolver = ToolResolver::with_tools(
            BTreeMap::new(),
            dir.path().to_path_buf(),
            Arc::new(TestPrompt::accepting()),
        );

        let path = resolver.locate("sh").await.unwrap();
        assert_eq!(path, PathBuf::from("sh"));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let dir = TempDir::new().unwrap();
        let resolver = ToolResolver::with_tools(
            BTreeMap::new(),
            dir.path().to_path_buf(),
            Arc::new(TestPrompt::accepting()),
        );

        let err = resolver.locate("odotest-absent-zz").await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "odotest-absent-zz"));
    }

    #[tokio::test]
    async fn existing_managed_copy_resolves_without_prompting() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("odotest"), b"binary").unwrap();
        let prompt = Arc::new(TestPrompt::accepting());
        let resolver = resolver_with(
            "odotest",
            descriptor("http://127.0.0.1:1/x.gz", "", "x.gz", "odotest"),
            dir.path(),
            prompt.clone(),
        );

        let path = resolver.locate("odotest").await.unwrap();
        assert_eq!(path, dir.path().join("odotest"));
        assert_eq!(prompt.confirms.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gz_download_installs_to_command_path() {
        let payload = b"#!/bin/sh\necho odotest\n";
        let body = gz_bytes(payload);
        let checksum = hex_digest(&body);
        let url = serve_fixture(body, "odotest.gz").await;

        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tools");
        let prompt = Arc::new(TestPrompt::accepting());
        let resolver = resolver_with(
            "odotest",
            descriptor(&url, &checksum, "odotest.gz", "odotest"),
            &root,
            prompt.clone(),
        );

        let path = resolver.locate("odotest").await.unwrap();
        assert_eq!(path, root.join("odotest"));
        assert_eq!(std::fs::read(&path).unwrap(), payload);
        // The consumed archive is cleaned up.
        assert!(!root.join("odotest.gz").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0);
        }

        // A second resolution finds the managed copy without prompting again.
        let again = resolver.locate("odotest").await.unwrap();
        assert_eq!(again, path);
        assert_eq!(prompt.confirms.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tar_gz_download_extracts_into_managed_root_with_prefix_strip() {
        let body = tar_gz_bytes(&[("release-dir/odotest", b"tar payload" as &[u8])]);
        let url = serve_fixture(body, "odotest.tar.gz").await;

        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tools");
        let mut desc = descriptor(&url, "", "odotest.tar.gz", "odotest");
        desc.archive_prefix = "release-dir/".into();
        let resolver = resolver_with("odotest", desc, &root, Arc::new(TestPrompt::accepting()));

        let path = resolver.locate("odotest").await.unwrap();
        assert_eq!(path, root.join("odotest"));
        assert_eq!(std::fs::read(&path).unwrap(), b"tar payload");
        assert!(!root.join("odotest.tar.gz").exists());
    }

    #[tokio::test]
    async fn declined_consent_cancels_resolution() {
        let dir = TempDir::new().unwrap();
        let prompt = Arc::new(TestPrompt::declining());
        let resolver = resolver_with(
            "odotest",
            descriptor("http://127.0.0.1:1/x.gz", "", "x.gz", "odotest"),
            dir.path(),
            prompt,
        );

        let err = resolver.locate("odotest").await.unwrap_err();
        assert!(matches!(err, ToolError::UserCancelled(_)));
        assert!(!dir.path().join("odotest").exists());
    }

    #[tokio::test]
    async fn help_choice_opens_documentation_and_cancels() {
        let dir = TempDir::new().unwrap();
        let prompt = Arc::new(TestPrompt::asking_for_help());
        let resolver = resolver_with(
            "odotest",
            descriptor("http://127.0.0.1:1/x.gz", "", "x.gz", "odotest"),
            dir.path(),
            prompt.clone(),
        );

        let err = resolver.locate("odotest").await.unwrap_err();
        assert!(matches!(err, ToolError::UserCancelled(_)));
        assert_eq!(*prompt.help_urls.lock().unwrap(), vec![HELP_URL.to_string()]);
        assert!(!dir.path().join("odotest").exists());
    }

    #[tokio::test]
    async fn checksum_mismatch_discards_file_and_surfaces_after_decline() {
        let url = serve_fixture(gz_bytes(b"corrupted"), "odotest.gz").await;

        let dir = TempDir::new().unwrap();
        let prompt = Arc::new(TestPrompt::retrying(0));
        let resolver = resolver_with(
            "odotest",
            descriptor(&url, "00deadbeef", "odotest.gz", "odotest"),
            dir.path(),
            prompt.clone(),
        );

        let err = resolver.locate("odotest").await.unwrap_err();
        match err {
            ToolError::ChecksumMismatch { tool, expected, .. } => {
                assert_eq!(tool, "odotest");
                assert_eq!(expected, "00deadbeef");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("odotest.gz").exists());
        assert_eq!(prompt.retries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mismatch_then_corrected_download_succeeds() {
        let payload = b"the real binary";
        let good = gz_bytes(payload);
        let checksum = hex_digest(&good);
        let url =
            serve_fixture_sequence(vec![gz_bytes(b"corrupted"), good], "odotest.gz").await;

        let dir = TempDir::new().unwrap();
        let prompt = Arc::new(TestPrompt::retrying(1));
        let resolver = resolver_with(
            "odotest",
            descriptor(&url, &checksum, "odotest.gz", "odotest"),
            dir.path(),
            prompt.clone(),
        );

        let path = resolver.locate("odotest").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), payload);
        assert_eq!(prompt.retries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mismatch_retry_loops_until_user_declines() {
        let url = serve_fixture(gz_bytes(b"still wrong"), "odotest.gz").await;

        let dir = TempDir::new().unwrap();
        let prompt = Arc::new(TestPrompt::retrying(2));
        let resolver = resolver_with(
            "odotest",
            descriptor(&url, "00deadbeef", "odotest.gz", "odotest"),
            dir.path(),
            prompt.clone(),
        );

        let err = resolver.locate("odotest").await.unwrap_err();
        assert!(matches!(err, ToolError::ChecksumMismatch { .. }));
        // Two retries granted, third mismatch declined.
        assert_eq!(prompt.retries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn concurrent_resolutions_share_one_acquisition() {
        let body = gz_bytes(b"payload");
        let checksum = hex_digest(&body);
        let url = serve_fixture(body, "odotest.gz").await;

        let dir = TempDir::new().unwrap();
        let prompt = Arc::new(TestPrompt::accepting());
        let resolver = resolver_with(
            "odotest",
            descriptor(&url, &checksum, "odotest.gz", "odotest"),
            dir.path(),
            prompt.clone(),
        );

        let (a, b) = tokio::join!(resolver.locate("odotest"), resolver.locate("odotest"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(prompt.confirms.load(Ordering::SeqCst), 1);
    }
}
