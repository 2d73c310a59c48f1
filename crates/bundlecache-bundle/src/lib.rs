//! On-disk formats for bundlecache
//!
//! This crate provides the file-level pieces of a bundle cache: per-platform
//! hash lists, the local cache layout and its diff against a hash list, the
//! seekable cipher stream used for at-rest encryption, the dependency
//! manifest, and the [`BundleStore`] seam with its ZIP implementation.
//!
//! # Cache Layout
//!
//! ```text
//! cache/
//! └── Android/
//!     ├── bundlehash.json        # BundleHashList
//!     ├── master                 # platform master, holds dependencies.json
//!     ├── master.manifest
//!     ├── characters
//!     └── characters.manifest
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bundlecache_bundle::{BundleCache, BundleHashList, Platform};
//!
//! let cache = BundleCache::new("cache", Platform::Android);
//! let list = cache.read_hash_list("bundlehash.json")?;
//!
//! for name in cache.compute_diff(&list) {
//!     println!("needs download: {name}");
//! }
//! # Ok::<(), bundlecache_bundle::BundleError>(())
//! ```

mod error;
mod platform;

pub mod archive;
pub mod builder;
pub mod cache;
pub mod cipher;
pub mod hash_list;
pub mod manifest;
pub mod store;

pub use archive::{ArchiveBundle, ArchiveStore};
pub use builder::{
    ArchiveBuilder, HashListBuilder, compute_crc32, compute_sha256, verify_sha256,
    write_encrypted_mirror,
};
pub use cache::BundleCache;
pub use cipher::{BLOCK_SIZE, CipherContext, Keystream, SeekableCipherStream};
pub use error::BundleError;
pub use hash_list::{BundleHashList, BundleInfo, COMPANION_EXTENSION};
pub use manifest::{DEPENDENCY_MANIFEST_OBJECT, DependencyManifest, VARIANT_SEPARATOR, split_variant};
pub use platform::Platform;
pub use store::{Asset, BundleHandle, BundleStore, Json};

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;
