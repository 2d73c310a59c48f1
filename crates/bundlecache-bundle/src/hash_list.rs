//! Hash list schema: the versioned record of which bundle files belong in a
//! platform's cache directory.
//!
//! The hash list is stored as UTF-8 JSON without a byte-order mark at
//! `{cache}/{platform_dir}/{hash_file_name}.{hash_file_extension}`.

use crate::{BundleError, BundleResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Extension of the companion metadata file stored next to each bundle.
pub const COMPANION_EXTENSION: &str = "manifest";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Metadata recorded for one bundle file.
///
/// The zero value (`BundleInfo::default()`) stands for "not recorded".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    /// Bundle file name, unique within a hash list.
    pub name: String,

    /// Size of the bundle file in bytes.
    pub content_size: u64,

    /// Hex SHA256 of the bundle file.
    #[serde(default)]
    pub content_hash: String,

    /// CRC32 of the bundle file, handed to the bundle store on open.
    #[serde(default)]
    pub crc32: u32,

    /// Companion manifest file name; `{name}.manifest` when empty.
    #[serde(default)]
    pub manifest_companion_name: String,

    /// Size of the companion manifest file in bytes.
    #[serde(default)]
    pub manifest_companion_size: u64,
}

static MISSING_INFO: BundleInfo = BundleInfo {
    name: String::new(),
    content_size: 0,
    content_hash: String::new(),
    crc32: 0,
    manifest_companion_name: String::new(),
    manifest_companion_size: 0,
};

impl BundleInfo {
    /// Create a record for a bundle file.
    #[must_use]
    pub fn new(name: &str, content_size: u64, content_hash: &str, crc32: u32) -> Self {
        Self {
            name: name.to_string(),
            content_size,
            content_hash: content_hash.to_string(),
            crc32,
            manifest_companion_name: String::new(),
            manifest_companion_size: 0,
        }
    }

    /// Record the companion manifest file.
    #[must_use]
    pub fn with_companion(mut self, name: &str, size: u64) -> Self {
        self.manifest_companion_name = name.to_string();
        self.manifest_companion_size = size;
        self
    }

    /// Name of the companion manifest file.
    #[must_use]
    pub fn companion_name(&self) -> String {
        if self.manifest_companion_name.is_empty() {
            format!("{}.{COMPANION_EXTENSION}", self.name)
        } else {
            self.manifest_companion_name.clone()
        }
    }

    /// Whether this is the "not recorded" sentinel.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.name.is_empty()
    }
}

/// Versioned record of the expected bundle files for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleHashList {
    /// When the list was produced.
    pub created_at_utc: DateTime<Utc>,

    /// Source control revision the bundles were built from.
    #[serde(default)]
    pub source_revision: String,

    /// The dependency manifest bundle of the platform.
    pub platform_master: BundleInfo,

    /// Every other bundle, keyed by name. Never contains the master.
    #[serde(default)]
    pub assets: HashMap<String, BundleInfo>,
}

impl BundleHashList {
    /// Create an empty list for a platform master, stamped with the current time.
    #[must_use]
    pub fn new(source_revision: &str, platform_master: BundleInfo) -> Self {
        Self {
            created_at_utc: Utc::now(),
            source_revision: source_revision.to_string(),
            platform_master,
            assets: HashMap::new(),
        }
    }

    /// Record a bundle.
    ///
    /// Returns `false` and leaves the list unchanged when `info` names the
    /// platform master.
    pub fn add_asset(&mut self, info: BundleInfo) -> bool {
        if info.name == self.platform_master.name {
            return false;
        }
        self.assets.insert(info.name.clone(), info);
        true
    }

    /// Get a bundle record, or the zero-value sentinel when absent.
    #[must_use]
    pub fn get_asset(&self, name: &str) -> &BundleInfo {
        self.assets.get(name).unwrap_or(&MISSING_INFO)
    }

    /// Get a bundle record if present.
    #[must_use]
    pub fn find_asset(&self, name: &str) -> Option<&BundleInfo> {
        self.assets.get(name)
    }

    /// Get the record for any bundle, including the platform master.
    #[must_use]
    pub fn get_entry(&self, name: &str) -> Option<&BundleInfo> {
        if name == self.platform_master.name {
            Some(&self.platform_master)
        } else {
            self.assets.get(name)
        }
    }

    /// Replace every field with the values of `other`.
    pub fn copy_from(&mut self, other: &BundleHashList) {
        self.created_at_utc = other.created_at_utc;
        self.source_revision.clone_from(&other.source_revision);
        self.platform_master.clone_from(&other.platform_master);
        self.assets.clone_from(&other.assets);
    }

    /// Every recorded bundle: the master first, then assets sorted by name.
    #[must_use]
    pub fn all_entries(&self) -> Vec<&BundleInfo> {
        let mut assets: Vec<&BundleInfo> = self.assets.values().collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));

        let mut entries = Vec::with_capacity(assets.len() + 1);
        entries.push(&self.platform_master);
        entries.extend(assets);
        entries
    }

    /// Total size in bytes of all recorded bundle and companion files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.all_entries()
            .iter()
            .map(|info| info.content_size + info.manifest_companion_size)
            .sum()
    }

    /// Validate the list.
    pub fn validate(&self) -> BundleResult<()> {
        if self.platform_master.name.is_empty() {
            return Err(BundleError::InvalidHashList(
                "platform_master.name is required".to_string(),
            ));
        }

        if self.assets.contains_key(&self.platform_master.name) {
            return Err(BundleError::InvalidHashList(format!(
                "assets must not contain the platform master {}",
                self.platform_master.name
            )));
        }

        for (key, info) in &self.assets {
            if key != &info.name {
                return Err(BundleError::InvalidHashList(format!(
                    "asset key {key} does not match entry name {}",
                    info.name
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> BundleResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON, tolerating a leading byte-order mark.
    pub fn from_json(json: &str) -> BundleResult<Self> {
        let json = json.strip_prefix('\u{feff}').unwrap_or(json);
        let list: Self = serde_json::from_str(json)?;
        list.validate()?;
        Ok(list)
    }

    /// Deserialize from raw file bytes.
    pub fn from_bytes(bytes: &[u8]) -> BundleResult<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = std::str::from_utf8(bytes)
            .map_err(|e| BundleError::InvalidHashList(format!("not valid UTF-8: {e}")))?;
        Self::from_json(text)
    }

    /// Read a hash list file.
    pub fn read_from<P: AsRef<Path>>(path: P) -> BundleResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BundleError::MissingFile(path.display().to_string())
            } else {
                BundleError::Io(e)
            }
        })?;
        Self::from_bytes(&bytes)
    }

    /// Write the hash list file as UTF-8 without a byte-order mark.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> BundleResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
