//! Platform detection for tool registry resolution.
//!
//! The registry keys its download variants by the platform identifiers the
//! upstream release pages use: `win32`, `darwin`, `linux`.

use std::fmt;

/// Shell quote character used when rendering quoted command options.
pub const SHELL_QUOTE: char = if cfg!(windows) { '"' } else { '\'' };

/// A platform the tool registry can carry download variants for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Win32,
    Darwin,
    Linux,
}

impl Platform {
    /// Detects the current platform at runtime.
    ///
    /// Returns `None` if the platform is unsupported; tools cannot be
    /// acquired there and the resolved registry stays empty.
    pub fn detect() -> Option<Self> {
        #[cfg(target_os = "windows")]
        {
            Some(Platform::Win32)
        }
        #[cfg(target_os = "macos")]
        {
            Some(Platform::Darwin)
        }
        #[cfg(target_os = "linux")]
        {
            Some(Platform::Linux)
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }

    /// Returns all platforms the registry can describe.
    pub fn all() -> &'static [Platform] {
        &[Self::Win32, Self::Darwin, Self::Linux]
    }

    /// Returns the registry identifier for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Darwin => "darwin",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_returns_some_on_tier1_targets() {
        #[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
        assert!(Platform::detect().is_some());
    }

    #[test]
    fn platform_identifiers() {
        assert_eq!(Platform::Win32.as_str(), "win32");
        assert_eq!(Platform::Darwin.as_str(), "darwin");
        assert_eq!(Platform::Linux.as_str(), "linux");
    }

    #[test]
    fn all_platforms_listed() {
        assert_eq!(Platform::all().len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn quote_char_on_unix() {
        assert_eq!(SHELL_QUOTE, '\'');
    }
}
