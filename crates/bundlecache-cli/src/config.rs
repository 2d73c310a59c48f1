//! bundlecache.toml loading

use anyhow::{Context, Result};
use bundlecache_bundle::Platform;
use bundlecache_core::CacheConfig;
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE: &str = "bundlecache.toml";

/// Load a configuration file
///
/// Without a path, `./bundlecache.toml` is used when present and the
/// defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<CacheConfig> {
    match path {
        Some(path) => from_file(path),
        None if Path::new(CONFIG_FILE).is_file() => from_file(Path::new(CONFIG_FILE)),
        None => Ok(CacheConfig::default()),
    }
}

/// Load and validate a configuration file
pub fn from_file(path: &Path) -> Result<CacheConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    from_str(&content).with_context(|| format!("Invalid config: {}", path.display()))
}

/// Parse and validate TOML configuration
pub fn from_str(content: &str) -> Result<CacheConfig> {
    let config: CacheConfig = toml::from_str(content).context("Failed to parse config")?;
    config.validate()?;
    Ok(config)
}

/// Platform from the command line, then the config, then the host
pub fn platform(config: &CacheConfig, arg: Option<&str>) -> Result<Platform> {
    match arg.or(config.platform.as_deref()) {
        Some(key) => Platform::parse(key).with_context(|| {
            let known: Vec<&str> = Platform::all().iter().map(|p| p.as_str()).collect();
            format!("Unknown platform: {key} (expected one of {})", known.join(", "))
        }),
        None => Platform::current().context("Host platform is not supported; pass --platform"),
    }
}

#[cfg(test)]
#[path = "config/config_tests.rs"]
mod config_tests;
