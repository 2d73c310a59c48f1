//! Bundle container seam.
//!
//! A [`BundleStore`] turns the verified bytes of one bundle file into an open
//! [`BundleHandle`]; a handle extracts named objects that an [`Asset`] type
//! decodes.

use crate::{BundleError, BundleResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Opens bundle containers from raw bytes.
#[async_trait]
pub trait BundleStore: Send + Sync + 'static {
    /// Open the bundle `name` from its bytes.
    ///
    /// `crc32` is the value recorded in the hash list; zero means unknown.
    async fn open(
        &self,
        name: &str,
        bytes: Vec<u8>,
        crc32: u32,
    ) -> BundleResult<Arc<dyn BundleHandle>>;
}

/// An open bundle container.
#[async_trait]
pub trait BundleHandle: Send + Sync + fmt::Debug {
    /// Bundle name this handle was opened for.
    fn name(&self) -> &str;

    /// Names of all objects in the bundle.
    fn object_names(&self) -> Vec<String>;

    /// Extract the bytes of object `name`.
    ///
    /// `type_tag` comes from [`Asset::TYPE_TAG`] and lets a store pick a
    /// decoding path. Stores may ignore it.
    async fn load_object(&self, name: &str, type_tag: &str) -> BundleResult<Vec<u8>>;
}

/// A value that can be decoded from an object in a bundle.
pub trait Asset: Sized + Send + 'static {
    /// Tag passed to [`BundleHandle::load_object`].
    const TYPE_TAG: &'static str;

    /// Decode the object bytes.
    fn from_bytes(object: &str, bytes: Vec<u8>) -> BundleResult<Self>;
}

impl Asset for Vec<u8> {
    const TYPE_TAG: &'static str = "bytes";

    fn from_bytes(_object: &str, bytes: Vec<u8>) -> BundleResult<Self> {
        Ok(bytes)
    }
}

impl Asset for String {
    const TYPE_TAG: &'static str = "text";

    fn from_bytes(object: &str, bytes: Vec<u8>) -> BundleResult<Self> {
        String::from_utf8(bytes).map_err(|e| BundleError::InvalidObject {
            object: object.to_string(),
            reason: e.to_string(),
        })
    }
}

/// JSON object decoded into `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Asset for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    const TYPE_TAG: &'static str = "json";

    fn from_bytes(object: &str, bytes: Vec<u8>) -> BundleResult<Self> {
        serde_json::from_slice(&bytes)
            .map(Json)
            .map_err(|e| BundleError::InvalidObject {
                object: object.to_string(),
                reason: e.to_string(),
            })
    }
}
