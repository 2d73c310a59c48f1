//! Runtime log level changes

use crate::sink::LogSinkManager;
use bundlecache_core::{CacheError, CacheResult, LogLevel};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::reload;

/// Handle for swapping the global level filter
pub struct ReloadHandle {
    handle: Mutex<Option<reload::Handle<LevelFilter, tracing_subscriber::Registry>>>,
}

impl ReloadHandle {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    pub fn global() -> &'static ReloadHandle {
        static INSTANCE: OnceCell<ReloadHandle> = OnceCell::new();
        INSTANCE.get_or_init(ReloadHandle::new)
    }

    /// Set by [`init_logging`](crate::init_logging)
    pub fn set_handle(&self, handle: reload::Handle<LevelFilter, tracing_subscriber::Registry>) {
        *self.handle.lock() = Some(handle);
    }

    pub fn is_installed(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Swap the level filter
    pub fn reload_level(&self, level: LogLevel) -> CacheResult<()> {
        let guard = self.handle.lock();
        let handle = guard.as_ref().ok_or(CacheError::NotInitialized)?;
        handle
            .reload(level_filter(level))
            .map_err(|e| CacheError::Internal(format!("failed to reload log filter: {e}")))
    }
}

impl Default for ReloadHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Change the level of both the global filter and the host sink
pub fn set_log_level(level: LogLevel) -> CacheResult<()> {
    LogSinkManager::global().set_level(level);
    ReloadHandle::global().reload_level(level)?;
    tracing::info!(%level, "log level changed");
    Ok(())
}

pub(crate) fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Off => LevelFilter::OFF,
    }
}
