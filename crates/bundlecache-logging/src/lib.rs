//! bundlecache-logging - tracing setup for hosts of the bundle cache
//!
//! This crate provides:
//! - [`init_logging`] installing a stderr fmt layer and a [`HostSinkLayer`]
//! - [`LogSinkManager`] holding an optional host closure that receives records
//! - [`set_log_level`] for changing the level while running

mod layer;
mod reload;
mod sink;

pub use bundlecache_core::LogLevel;
pub use layer::{HostSinkLayer, init_logging, init_logging_from_name};
pub use reload::{ReloadHandle, set_log_level};
pub use sink::{LogSink, LogSinkManager};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LogLevel, LogSinkManager, init_logging, set_log_level};
}
