//! # bundlecache
//!
//! An asset bundle cache for applications that ship content as separately
//! versioned bundle files.
//!
//! bundlecache keeps a per-platform cache directory in step with a published
//! hash list and loads bundles on demand, providing:
//! - Optional at-rest encryption with a seekable stream cipher
//! - Size-based diffing against the hash list
//! - Dependency resolution with variant remapping
//! - Reference-counted loading with per-attempt timeouts and bounded retries
//! - A server mode that preloads everything into memory
//!
//! ## Quick Start
//!
//! ```no_run
//! use bundlecache::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct Hero {
//!     name: String,
//! }
//!
//! # async fn run() -> CacheResult<()> {
//! init_logging(LogLevel::Info);
//!
//! let config = CacheConfig::new()
//!     .with_platform("android")
//!     .with_encryption(EncryptionConfig::raw(
//!         "0123456789abcdef0123456789abcdef",
//!         "fedcba9876543210",
//!     ));
//! let registry = BundleRegistry::with_archive_store(config);
//!
//! if !registry.setup(CancellationToken::new(), false, "cache").await? {
//!     return Err(CacheError::NotInitialized);
//! }
//! if registry.is_diff_data() {
//!     tracing::warn!(files = ?registry.diff_list(), "cache is out of date");
//! }
//!
//! let mut hero = registry.load_asset::<Json<Hero>>("heroes", "aria.json")?;
//! let hero = hero.wait().await?.into_inner();
//! tracing::info!(name = %hero.name, "hero loaded");
//!
//! registry.unload_bundle("heroes")?;
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports from:
//! - [`bundlecache_core`] - Configuration, errors, and state enums
//! - [`bundlecache_bundle`] - Cipher, hash list, cache directory, and archive formats
//! - [`bundlecache_runtime`] - Resolver, load requests, and the registry
//! - [`bundlecache_logging`] - Tracing setup and the host log sink

// Re-export core types
pub use bundlecache_core::{
    CacheConfig, CacheError, CacheResult, DependencyLoad, EncryptionConfig, LoadState, LogLevel,
    ProgressStatus,
};

// Re-export bundle formats
pub use bundlecache_bundle::{
    ArchiveBuilder, ArchiveBundle, ArchiveStore, Asset, BundleCache, BundleError, BundleHandle,
    BundleHashList, BundleInfo, BundleResult, BundleStore, CipherContext,
    DEPENDENCY_MANIFEST_OBJECT, DependencyManifest, HashListBuilder, Json, Platform,
    SeekableCipherStream, write_encrypted_mirror,
};

// Re-export the runtime
pub use bundlecache_runtime::{
    AssetRequest, BundleLoader, BundleRegistry, BundleRequest, DependencyResolver, LoadRequest,
    RetryPolicy,
};

// Re-export logging
pub use bundlecache_logging::{LogSinkManager, init_logging, set_log_level};

// Re-export common dependencies that hosts need
pub use async_trait::async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tokio_util::sync::CancellationToken;
pub use tracing;

/// Prelude module for convenient imports.
///
/// Use `use bundlecache::prelude::*;` to import commonly used types.
///
/// This includes:
/// - Configuration and errors: `CacheConfig`, `EncryptionConfig`, `CacheError`, `CacheResult`
/// - The registry and its handles: `BundleRegistry`, `BundleRequest`, `AssetRequest`
/// - Asset decoding: `Asset`, `Json`
/// - Logging: `init_logging`, `LogLevel`
/// - Common deps: `CancellationToken`, `async_trait`, `Serialize`, `Deserialize`
pub mod prelude {
    pub use crate::{
        Asset, AssetRequest, BundleHandle, BundleRegistry, BundleRequest, BundleStore,
        CacheConfig, CacheError, CacheResult, CancellationToken, EncryptionConfig, Json, LogLevel,
        Platform, ProgressStatus, async_trait, init_logging,
    };

    pub use serde::{Deserialize, Serialize};
}
