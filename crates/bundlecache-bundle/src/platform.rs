//! Content platform detection and identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platforms that bundles are built for.
///
/// Each platform has its own directory in the cache root holding its hash
/// list, dependency manifest, and bundle files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows desktop.
    Windows,
    /// macOS desktop.
    MacOs,
    /// Linux desktop.
    Linux,
    /// Android devices.
    Android,
    /// iOS devices.
    Ios,
    /// Browser builds.
    WebGl,
}

impl Platform {
    /// Detect the current platform at runtime.
    #[must_use]
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            _ => None,
        }
    }

    /// Get the platform key string (e.g., "android").
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Android => "android",
            Self::Ios => "ios",
            Self::WebGl => "webgl",
        }
    }

    /// Parse a platform from its key string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            "webgl" => Some(Self::WebGl),
            _ => None,
        }
    }

    /// Directory name of this platform inside a cache root.
    ///
    /// # Example
    ///
    /// ```
    /// use bundlecache_bundle::Platform;
    ///
    /// assert_eq!(Platform::Android.dir_name(), "Android");
    /// assert_eq!(Platform::MacOs.dir_name(), "OSX");
    /// ```
    #[must_use]
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "OSX",
            Self::Linux => "Linux",
            Self::Android => "Android",
            Self::Ios => "iOS",
            Self::WebGl => "WebGL",
        }
    }

    /// Get all known platforms.
    #[must_use]
    pub fn all() -> &'static [Platform] {
        &[
            Self::Windows,
            Self::MacOs,
            Self::Linux,
            Self::Android,
            Self::Ios,
            Self::WebGl,
        ]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
