//! Local cache directory layout and hash-list diffing.
//!
//! ```text
//! {root}/
//! └── Android/
//!     ├── bundlehash.json
//!     ├── master
//!     ├── master.manifest
//!     ├── characters
//!     └── characters.manifest
//! ```

use crate::builder::{compute_crc32, compute_sha256, verify_sha256};
use crate::cipher::{CipherContext, SeekableCipherStream};
use crate::hash_list::{BundleHashList, BundleInfo};
use crate::{BundleError, BundleResult, Platform};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Read chunk size for bundle files.
const READ_CHUNK: usize = 64 * 1024;

/// One platform's view of a local cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleCache {
    root: PathBuf,
    platform: Platform,
}

impl BundleCache {
    /// Create a view of `root` for `platform`. Nothing is touched on disk.
    pub fn new<P: Into<PathBuf>>(root: P, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Directory holding this platform's files.
    #[must_use]
    pub fn platform_dir(&self) -> PathBuf {
        self.root.join(self.platform.dir_name())
    }

    /// Path of a bundle or companion file.
    #[must_use]
    pub fn bundle_path(&self, name: &str) -> PathBuf {
        self.platform_dir().join(name)
    }

    /// Path of the hash-list file, given its full file name.
    #[must_use]
    pub fn hash_list_path(&self, hash_file: &str) -> PathBuf {
        self.platform_dir().join(hash_file)
    }

    /// Read this platform's hash list.
    pub fn read_hash_list(&self, hash_file: &str) -> BundleResult<BundleHashList> {
        BundleHashList::read_from(self.hash_list_path(hash_file))
    }

    /// Names of files that are missing or whose length differs from `list`.
    ///
    /// Bundles and their companion manifests are both checked. Only the file
    /// length is compared. The master comes first, then assets by name.
    #[must_use]
    pub fn compute_diff(&self, list: &BundleHashList) -> Vec<String> {
        let mut diff = Vec::new();

        for info in list.all_entries() {
            if !self.matches_size(&info.name, info.content_size) {
                diff.push(info.name.clone());
            }

            let companion = info.companion_name();
            if !self.matches_size(&companion, info.manifest_companion_size) {
                diff.push(companion);
            }
        }

        if !diff.is_empty() {
            tracing::debug!(
                platform = %self.platform,
                count = diff.len(),
                "cache differs from hash list"
            );
        }
        diff
    }

    fn matches_size(&self, name: &str, expected: u64) -> bool {
        match fs::metadata(self.bundle_path(name)) {
            Ok(meta) => meta.is_file() && meta.len() == expected,
            Err(_) => false,
        }
    }

    /// Strict check of one bundle file: size, CRC32, and SHA-256.
    ///
    /// The CRC and hash are computed over the decrypted bytes when `cipher`
    /// is given. A zero CRC or empty hash in `info` skips that check.
    pub fn verify_entry(&self, info: &BundleInfo, cipher: Option<&CipherContext>) -> BundleResult<()> {
        let path = self.bundle_path(&info.name);
        let actual_size = fs::metadata(&path)
            .map_err(|e| missing_or_io(e, &path))?
            .len();
        if actual_size != info.content_size {
            return Err(BundleError::ChecksumMismatch {
                path: info.name.clone(),
                expected: format!("{} bytes", info.content_size),
                actual: format!("{actual_size} bytes"),
            });
        }

        let bytes = self.read_bundle(&info.name, cipher, |_| {})?;

        if info.crc32 != 0 {
            let actual = compute_crc32(&bytes);
            if actual != info.crc32 {
                return Err(BundleError::CrcMismatch {
                    name: info.name.clone(),
                    expected: info.crc32,
                    actual,
                });
            }
        }

        if !info.content_hash.is_empty() && !verify_sha256(&bytes, &info.content_hash) {
            return Err(BundleError::ChecksumMismatch {
                path: info.name.clone(),
                expected: info.content_hash.clone(),
                actual: compute_sha256(&bytes),
            });
        }

        let companion = info.companion_name();
        if !self.matches_size(&companion, info.manifest_companion_size) {
            return Err(BundleError::ChecksumMismatch {
                path: companion,
                expected: format!("{} bytes", info.manifest_companion_size),
                actual: "missing or different size".to_string(),
            });
        }

        Ok(())
    }

    /// Read a whole bundle file, decrypting it when `cipher` is given.
    ///
    /// `on_read` receives the running byte count after each chunk. A
    /// zero-length file is an error.
    pub fn read_bundle<F>(
        &self,
        name: &str,
        cipher: Option<&CipherContext>,
        mut on_read: F,
    ) -> BundleResult<Vec<u8>>
    where
        F: FnMut(u64),
    {
        let path = self.bundle_path(name);
        let file = File::open(&path).map_err(|e| missing_or_io(e, &path))?;

        let bytes = match cipher {
            Some(ctx) => {
                let mut stream = SeekableCipherStream::new(file, ctx)?;
                read_chunked(&mut stream, &mut on_read)?
            }
            None => {
                let mut file = file;
                read_chunked(&mut file, &mut on_read)?
            }
        };

        if bytes.is_empty() {
            return Err(BundleError::EmptyBundle(name.to_string()));
        }
        Ok(bytes)
    }

    /// Delete the whole cache root.
    pub fn clear(&self) -> BundleResult<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                tracing::info!(root = %self.root.display(), "cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_chunked<R: Read, F: FnMut(u64)>(reader: &mut R, on_read: &mut F) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        bytes.extend_from_slice(&chunk[..n]);
        on_read(bytes.len() as u64);
    }
    Ok(bytes)
}

fn missing_or_io(err: io::Error, path: &Path) -> BundleError {
    if err.kind() == io::ErrorKind::NotFound {
        BundleError::MissingFile(path.display().to_string())
    } else {
        BundleError::Io(err)
    }
}

#[cfg(test)]
#[path = "cache/cache_tests.rs"]
mod cache_tests;
