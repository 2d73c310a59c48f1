//! Error types for bundle file operations.

use bundlecache_core::CacheError;
use thiserror::Error;

/// Errors that can occur while reading, writing, or opening bundle files.
#[derive(Debug, Error)]
pub enum BundleError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive error.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Hash list validation error.
    #[error("Invalid hash list: {0}")]
    InvalidHashList(String),

    /// Dependency manifest validation error.
    #[error("Invalid dependency manifest: {0}")]
    InvalidManifest(String),

    /// CRC32 of the bundle bytes does not match the hash list.
    #[error("CRC mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// Size or SHA256 mismatch against the hash list.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Missing required file.
    #[error("Missing required file: {0}")]
    MissingFile(String),

    /// Named object not present in a bundle.
    #[error("Object {object} not found in bundle {bundle}")]
    MissingObject { bundle: String, object: String },

    /// Object bytes could not be decoded as the requested type.
    #[error("Invalid object {object}: {reason}")]
    InvalidObject { object: String, reason: String },

    /// Bundle bytes are empty.
    #[error("Bundle is empty: {0}")]
    EmptyBundle(String),

    /// Key or IV has the wrong shape.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// Cipher transform failure.
    #[error("Cipher error: {0}")]
    Crypto(String),

    /// Platform not known to this build.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl From<BundleError> for CacheError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::Io(e) => CacheError::IoError(e.to_string()),
            BundleError::MissingFile(path) => CacheError::IoError(format!("missing file: {path}")),
            BundleError::EmptyBundle(name) => CacheError::IoError(format!("empty bundle: {name}")),
            e @ (BundleError::CrcMismatch { .. } | BundleError::ChecksumMismatch { .. }) => {
                CacheError::IntegrityError(e.to_string())
            }
            e @ (BundleError::Json(_)
            | BundleError::Zip(_)
            | BundleError::MissingObject { .. }
            | BundleError::InvalidObject { .. }) => CacheError::IntegrityError(e.to_string()),
            BundleError::InvalidHashList(msg) | BundleError::InvalidManifest(msg) => {
                CacheError::ConfigError(msg)
            }
            BundleError::InvalidKey(msg) => CacheError::ConfigError(msg),
            BundleError::Crypto(msg) => CacheError::CryptoError(msg),
            BundleError::UnsupportedPlatform(p) => {
                CacheError::ConfigError(format!("unsupported platform: {p}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn BundleError___io___displays_message() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BundleError = io_err.into();

        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn BundleError___crc_mismatch___displays_hex_values() {
        let err = BundleError::CrcMismatch {
            name: "ui".to_string(),
            expected: 0xdeadbeef,
            actual: 0x1,
        };

        let msg = err.to_string();
        assert!(msg.contains("ui"));
        assert!(msg.contains("deadbeef"));
        assert!(msg.contains("00000001"));
    }

    #[test]
    fn BundleError___missing_object___displays_bundle_and_object() {
        let err = BundleError::MissingObject {
            bundle: "characters".to_string(),
            object: "hero.json".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Object hero.json not found in bundle characters"
        );
    }

    #[test]
    fn BundleError___into_cache_error___maps_taxonomy() {
        let io: CacheError = BundleError::MissingFile("a".into()).into();
        let crc: CacheError = BundleError::CrcMismatch {
            name: "a".into(),
            expected: 1,
            actual: 2,
        }
        .into();
        let key: CacheError = BundleError::InvalidKey("short".into()).into();
        let crypto: CacheError = BundleError::Crypto("bad".into()).into();

        assert!(matches!(io, CacheError::IoError(_)));
        assert!(matches!(crc, CacheError::IntegrityError(_)));
        assert!(matches!(key, CacheError::ConfigError(_)));
        assert!(matches!(crypto, CacheError::CryptoError(_)));
    }

    #[test]
    fn BundleError___from_io_error___converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let bundle_err: BundleError = io_err.into();

        assert!(matches!(bundle_err, BundleError::Io(_)));
    }
}
