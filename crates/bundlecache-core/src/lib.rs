//! bundlecache-core - Errors, configuration, and load states
//!
//! This crate provides the foundational types shared by the bundle cache
//! engine:
//! - [`CacheError`] taxonomy and [`CacheResult`]
//! - [`CacheConfig`] and [`EncryptionConfig`]
//! - [`LoadState`], [`DependencyLoad`], and [`ProgressStatus`] state enums

mod config;
mod error;
mod state;

pub use config::{CacheConfig, EncryptionConfig, IV_LENGTH, KEY_LENGTH, MIN_SALT_LENGTH};
pub use error::{CacheError, CacheResult};
pub use state::{DependencyLoad, LoadState, ProgressStatus};

/// Log levels for host log sinks
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }

    /// Parse a level name as used in [`CacheConfig::log_level`]
    ///
    /// Matching is case-insensitive; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CacheConfig, CacheError, CacheResult, DependencyLoad, EncryptionConfig, LoadState,
        LogLevel, ProgressStatus,
    };
}
