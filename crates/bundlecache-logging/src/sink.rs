//! Host log sink management

use bundlecache_core::LogLevel;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Closure that receives forwarded log records
///
/// Arguments are the level, the target (module path), and the formatted
/// message. Called on whatever thread emitted the event, so it must be cheap
/// and must not log through `tracing` itself.
pub type LogSink = Arc<dyn Fn(LogLevel, &str, &str) + Send + Sync>;

static SINK_MANAGER: OnceCell<LogSinkManager> = OnceCell::new();

/// Holds the host sink and the level it receives
pub struct LogSinkManager {
    sink: RwLock<Option<LogSink>>,
    level: AtomicU8,
}

impl LogSinkManager {
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(None),
            level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Process-wide manager used by [`init_logging`](crate::init_logging)
    pub fn global() -> &'static LogSinkManager {
        SINK_MANAGER.get_or_init(LogSinkManager::new)
    }

    /// Register a sink, replacing any previous one
    pub fn set_sink<F>(&self, sink: F)
    where
        F: Fn(LogLevel, &str, &str) + Send + Sync + 'static,
    {
        *self.sink.write() = Some(Arc::new(sink));
    }

    /// Remove the sink
    pub fn clear_sink(&self) {
        *self.sink.write() = None;
    }

    pub fn has_sink(&self) -> bool {
        self.sink.read().is_some()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::SeqCst))
    }

    /// Whether records at `level` reach the sink
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }

    /// Forward one record if a sink is set and the level is enabled
    pub fn log(&self, level: LogLevel, target: &str, message: &str) {
        if !self.is_enabled(level) {
            return;
        }

        // Clone out so the sink runs without the lock held.
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink(level, target, message);
        }
    }
}

impl Default for LogSinkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogSinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSinkManager")
            .field("has_sink", &self.has_sink())
            .field("level", &self.level())
            .finish()
    }
}
