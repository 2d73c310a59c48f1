//! Cache engine configuration types

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Required length of a raw cipher key, in ASCII characters
pub const KEY_LENGTH: usize = 32;

/// Required length of a raw cipher IV, in ASCII characters
pub const IV_LENGTH: usize = 16;

/// Minimum salt length accepted for password-derived keys
pub const MIN_SALT_LENGTH: usize = 8;

/// Configuration for a bundle registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Active platform key (e.g. "android"). Detected from the host when unset.
    #[serde(default)]
    pub platform: Option<String>,

    /// Platforms whose hash lists are loaded during setup
    ///
    /// Empty means "only the active platform".
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Hash-list file name without extension
    #[serde(default = "default_hash_file_name")]
    pub hash_file_name: String,

    /// Hash-list file extension
    #[serde(default = "default_hash_file_extension")]
    pub hash_file_extension: String,

    /// At-rest encryption of bundle files
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Retries after the first failed attempt before a load is terminal
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-attempt deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Interval of the polling loop in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Variant tags in priority order, used to remap variant dependencies
    #[serde(default)]
    pub active_variants: Vec<String>,

    /// Initial log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_hash_file_name() -> String {
    "bundlehash".to_string()
}

fn default_hash_file_extension() -> String {
    "json".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            platform: None,
            platforms: Vec::new(),
            hash_file_name: default_hash_file_name(),
            hash_file_extension: default_hash_file_extension(),
            encryption: EncryptionConfig::default(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            active_variants: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl CacheConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from JSON bytes
    ///
    /// Empty input yields the defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
    }

    /// Set the active platform key
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the encryption settings
    pub fn with_encryption(mut self, encryption: EncryptionConfig) -> Self {
        self.encryption = encryption;
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the polling interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the active variant priority list
    pub fn with_active_variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_variants = variants.into_iter().map(Into::into).collect();
        self
    }

    /// Per-attempt timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Polling interval as a duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Full hash-list file name, e.g. `bundlehash.json`
    pub fn hash_file(&self) -> String {
        format!("{}.{}", self.hash_file_name, self.hash_file_extension)
    }

    /// Check the configuration before any file or cipher work is attempted
    pub fn validate(&self) -> CacheResult<()> {
        if self.hash_file_name.is_empty() {
            return Err(CacheError::ConfigError(
                "hash_file_name is required".to_string(),
            ));
        }

        if self.hash_file_extension.is_empty() {
            return Err(CacheError::ConfigError(
                "hash_file_extension is required".to_string(),
            ));
        }

        if self.tick_interval_ms == 0 {
            return Err(CacheError::ConfigError(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        self.encryption.validate()
    }
}

/// Key material for at-rest bundle encryption
///
/// `Raw` is the current scheme. `Password` reproduces the earlier scheme that
/// stretched a password and salt into the key and IV. The two are separate
/// variants and never combined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EncryptionConfig {
    /// Bundle files are stored in plain form
    #[default]
    None,
    /// Fixed-length ASCII key and IV
    Raw { key: String, iv: String },
    /// Key and IV derived with PBKDF2-HMAC-SHA256
    Password {
        password: String,
        salt: String,
        #[serde(default = "default_iterations")]
        iterations: u32,
    },
}

fn default_iterations() -> u32 {
    1000
}

impl EncryptionConfig {
    /// Raw key material
    pub fn raw(key: impl Into<String>, iv: impl Into<String>) -> Self {
        EncryptionConfig::Raw {
            key: key.into(),
            iv: iv.into(),
        }
    }

    /// Password-derived key material with the default iteration count
    pub fn password(password: impl Into<String>, salt: impl Into<String>) -> Self {
        EncryptionConfig::Password {
            password: password.into(),
            salt: salt.into(),
            iterations: default_iterations(),
        }
    }

    /// Whether bundle files are cipher-wrapped
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EncryptionConfig::None)
    }

    /// Validate key material lengths
    pub fn validate(&self) -> CacheResult<()> {
        match self {
            EncryptionConfig::None => Ok(()),
            EncryptionConfig::Raw { key, iv } => {
                if !key.is_ascii() || key.len() != KEY_LENGTH {
                    return Err(CacheError::ConfigError(format!(
                        "encryption key must be {KEY_LENGTH} ASCII characters, got {}",
                        key.chars().count()
                    )));
                }
                if !iv.is_ascii() || iv.len() != IV_LENGTH {
                    return Err(CacheError::ConfigError(format!(
                        "encryption IV must be {IV_LENGTH} ASCII characters, got {}",
                        iv.chars().count()
                    )));
                }
                Ok(())
            }
            EncryptionConfig::Password {
                password,
                salt,
                iterations,
            } => {
                if password.is_empty() {
                    return Err(CacheError::ConfigError(
                        "encryption password is required".to_string(),
                    ));
                }
                if salt.len() < MIN_SALT_LENGTH {
                    return Err(CacheError::ConfigError(format!(
                        "encryption salt must be at least {MIN_SALT_LENGTH} bytes"
                    )));
                }
                if *iterations == 0 {
                    return Err(CacheError::ConfigError(
                        "encryption iterations must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "config/config_tests.rs"]
mod config_tests;
