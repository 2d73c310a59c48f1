//! Subscriber assembly and the layer that forwards events to the host sink

use crate::reload::ReloadHandle;
use crate::sink::LogSinkManager;
use bundlecache_core::LogLevel;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Tracing layer that forwards events to the registered [`LogSinkManager`] sink
pub struct HostSinkLayer {
    manager: &'static LogSinkManager,
}

impl HostSinkLayer {
    /// Layer using the global manager
    pub fn new() -> Self {
        Self {
            manager: LogSinkManager::global(),
        }
    }

    pub fn with_manager(manager: &'static LogSinkManager) -> Self {
        Self { manager }
    }

    fn convert_level(level: &Level) -> LogLevel {
        match *level {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        }
    }
}

impl Default for HostSinkLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Self::convert_level(metadata.level());
        if !self.manager.is_enabled(level) || !self.manager.has_sink() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.manager
            .log(level, metadata.target(), &visitor.into_message());
    }
}

/// Collects the `message` field and renders the rest as `key=value` pairs
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn into_message(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }
}

/// Install the global subscriber
///
/// Layers, outermost first: a reloadable level filter, a stderr fmt layer
/// filtered by `RUST_LOG` (falling back to `level`), and the host sink layer.
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(level: LogLevel) -> bool {
    use tracing_subscriber::prelude::*;

    let (level_layer, handle) =
        tracing_subscriber::reload::Layer::new(crate::reload::level_filter(level));
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    let subscriber = tracing_subscriber::registry()
        .with(level_layer)
        .with(fmt_layer)
        .with(HostSinkLayer::new());

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    LogSinkManager::global().set_level(level);
    ReloadHandle::global().set_handle(handle);
    true
}

/// Install the global subscriber using a level name such as `"debug"`
///
/// Unknown names fall back to `info`.
pub fn init_logging_from_name(name: &str) -> bool {
    init_logging(LogLevel::parse(name).unwrap_or(LogLevel::Info))
}
