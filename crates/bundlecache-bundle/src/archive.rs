//! ZIP-archive bundle store.

use crate::builder::compute_crc32;
use crate::store::{BundleHandle, BundleStore};
use crate::{BundleError, BundleResult};
use async_trait::async_trait;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::Arc;
use zip::ZipArchive;

/// Store that opens bundles as ZIP archives.
///
/// # Example
///
/// ```
/// use bundlecache_bundle::{ArchiveBuilder, ArchiveStore, BundleStore};
///
/// # tokio_test_block_on(async {
/// let bytes = ArchiveBuilder::new().add_bytes("greeting.txt", b"hi".to_vec()).to_bytes()?;
/// let handle = ArchiveStore::new().open("greetings", bytes, 0).await?;
///
/// assert_eq!(handle.load_object("greeting.txt", "text").await?, b"hi");
/// # Ok::<(), bundlecache_bundle::BundleError>(())
/// # }).unwrap();
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveStore;

impl ArchiveStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Open synchronously. See [`BundleStore::open`].
    pub fn open_archive(&self, name: &str, bytes: Vec<u8>, crc32: u32) -> BundleResult<ArchiveBundle> {
        if bytes.is_empty() {
            return Err(BundleError::EmptyBundle(name.to_string()));
        }

        if crc32 != 0 {
            let actual = compute_crc32(&bytes);
            if actual != crc32 {
                tracing::warn!(bundle = name, expected = crc32, actual, "bundle CRC mismatch");
                return Err(BundleError::CrcMismatch {
                    name: name.to_string(),
                    expected: crc32,
                    actual,
                });
            }
        }

        let data: Arc<[u8]> = Arc::from(bytes);
        let archive = ZipArchive::new(Cursor::new(data))?;
        tracing::debug!(bundle = name, objects = archive.len(), "opened archive bundle");

        Ok(ArchiveBundle {
            name: name.to_string(),
            archive,
        })
    }
}

#[async_trait]
impl BundleStore for ArchiveStore {
    async fn open(
        &self,
        name: &str,
        bytes: Vec<u8>,
        crc32: u32,
    ) -> BundleResult<Arc<dyn BundleHandle>> {
        let bundle = self.open_archive(name, bytes, crc32)?;
        Ok(Arc::new(bundle))
    }
}

/// An open ZIP bundle.
///
/// The archive bytes are shared, so extracting objects does not copy them.
#[derive(Clone)]
pub struct ArchiveBundle {
    name: String,
    archive: ZipArchive<Cursor<Arc<[u8]>>>,
}

impl ArchiveBundle {
    /// Read object `name` as bytes.
    pub fn read_object(&self, name: &str) -> BundleResult<Vec<u8>> {
        let mut archive = self.archive.clone();
        let mut file = archive.by_name(name).map_err(|_| BundleError::MissingObject {
            bundle: self.name.clone(),
            object: name.to_string(),
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Check if an object exists in the bundle.
    #[must_use]
    pub fn has_object(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }
}

impl fmt::Debug for ArchiveBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveBundle")
            .field("name", &self.name)
            .field("objects", &self.archive.len())
            .finish()
    }
}

#[async_trait]
impl BundleHandle for ArchiveBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn object_names(&self) -> Vec<String> {
        self.archive.file_names().map(String::from).collect()
    }

    async fn load_object(&self, name: &str, type_tag: &str) -> BundleResult<Vec<u8>> {
        tracing::trace!(bundle = %self.name, object = name, type_tag, "loading object");
        self.read_object(name)
    }
}
