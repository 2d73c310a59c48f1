//! bundlecache-runtime - dependency-aware loading on Tokio
//!
//! This crate provides:
//! - [`DependencyResolver`] for variant remapping and transitive dependencies
//! - [`LoadRequest`] and [`BundleLoader`] for one bundle's retrying load
//! - [`BundleRegistry`] for reference-counted loading driven by a [`PollingLoop`]
//! - [`BundleRequest`] and [`AssetRequest`] handles returned to callers

mod operation;
mod registry;
mod request;
mod resolver;
mod scheduler;

pub use operation::{AssetRequest, BundleRequest, Completion};
pub use registry::{BundleRegistry, dependency_state};
pub use request::{BundleLoader, LoadRequest, RetryPolicy};
pub use resolver::DependencyResolver;
pub use scheduler::{PollTarget, PollingLoop};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{AssetRequest, BundleRegistry, BundleRequest, DependencyResolver, RetryPolicy};
}
