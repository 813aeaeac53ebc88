//! Subprocess execution for resolved tools.
//!
//! Command lines are resolved through the [`ToolResolver`] before running:
//! the leading token names the tool, and is replaced by the resolved
//! executable path. Failures to resolve are `Err`; a process that runs and
//! exits non-zero is a successful call whose [`CliExitData`] carries the
//! exit error alongside captured output.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::command::CommandText;
use crate::error::ToolError;
use crate::resolver::ToolResolver;

/// Default wall-clock limit for a single tool invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Some tools print a license banner delimited by `---` lines ahead of their
/// real output; it is stripped before stdout is handed back.
static BANNER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)---.*---").unwrap());

/// Why a finished invocation is not a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitError {
    /// Process exit code, when the process exited normally.
    pub code: Option<i32>,
    pub message: String,
}

/// Outcome of a tool invocation that actually ran.
#[derive(Debug, Clone)]
pub struct CliExitData {
    /// `None` on a zero exit status.
    pub error: Option<ExitError>,
    pub stdout: String,
    pub stderr: String,
}

impl CliExitData {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-invocation execution settings.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Overrides [`DEFAULT_TIMEOUT`] when set.
    pub timeout: Option<Duration>,
}

/// Runs tool command lines through the platform shell.
pub struct Cli {
    resolver: ToolResolver,
}

impl Cli {
    pub fn new(resolver: ToolResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ToolResolver {
        &self.resolver
    }

    /// Renders a structured command with privacy off and executes it. The
    /// log line uses the privacy rendering so secrets never reach the log.
    pub async fn execute_command(
        &self,
        command: &CommandText,
        options: ExecOptions,
    ) -> Result<CliExitData, ToolError> {
        let redacted = command.clone().privacy_mode(true);
        info!(command = %redacted, "executing tool command");
        self.execute(&command.to_string(), options).await
    }

    /// Executes a command line, resolving the leading token to a tool path.
    ///
    /// Returns `Err` only when resolution fails or the process cannot be
    /// spawned. A non-zero exit or a timeout is reported inside the returned
    /// [`CliExitData`].
    pub async fn execute(
        &self,
        command_line: &str,
        options: ExecOptions,
    ) -> Result<CliExitData, ToolError> {
        let tool = command_line
            .split_whitespace()
            .next()
            .ok_or_else(|| ToolError::NotFound(String::new()))?;
        let location = self.resolver.locate(tool).await?;
        let resolved = command_line.replacen(tool, &location.to_string_lossy(), 1);
        debug!(command = %resolved, "spawning process");

        let mut cmd = shell_command(&resolved);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        let limit = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(command = %resolved, ?limit, "process timed out");
                return Ok(CliExitData {
                    error: Some(ExitError {
                        code: None,
                        message: format!("timed out after {}s", limit.as_secs()),
                    }),
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
        };

        let stdout = strip_banner(&String::from_utf8_lossy(&output.stdout));
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let error = if output.status.success() {
            None
        } else {
            warn!(status = %output.status, "process exited with failure");
            Some(ExitError {
                code: output.status.code(),
                message: output.status.to_string(),
            })
        };

        Ok(CliExitData {
            error,
            stdout,
            stderr,
        })
    }
}

fn shell_command(command_line: &str) -> tokio::process::Command {
    #[cfg(windows)]
    {
        let mut cmd = tokio::process::Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

fn strip_banner(stdout: &str) -> String {
    BANNER.replace(stdout, "").trim().to_string()
}
