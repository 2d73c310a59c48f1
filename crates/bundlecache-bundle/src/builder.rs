//! Build-side helpers: bundle archives, hash lists, and encrypted mirrors.

use crate::cipher::{CipherContext, SeekableCipherStream};
use crate::hash_list::{BundleHashList, BundleInfo, COMPANION_EXTENSION};
use crate::{BundleError, BundleResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Builder for bundle archives.
///
/// # Example
///
/// ```no_run
/// use bundlecache_bundle::ArchiveBuilder;
///
/// ArchiveBuilder::new()
///     .add_bytes("hero.json", br#"{"name":"ada"}"#.to_vec())
///     .add_file("art/hero.png", "hero.png")?
///     .write("build/Android/characters")?;
/// # Ok::<(), bundlecache_bundle::BundleError>(())
/// ```
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    files: Vec<ArchiveFile>,
}

/// A file to include in the archive.
#[derive(Debug)]
struct ArchiveFile {
    /// Object name within the archive.
    archive_path: String,
    contents: Vec<u8>,
}

impl ArchiveBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add raw bytes as an object.
    #[must_use]
    pub fn add_bytes(mut self, archive_path: &str, contents: Vec<u8>) -> Self {
        self.files.push(ArchiveFile {
            archive_path: archive_path.to_string(),
            contents,
        });
        self
    }

    /// Add a value serialized as pretty JSON.
    pub fn add_json<T: Serialize>(self, archive_path: &str, value: &T) -> BundleResult<Self> {
        let contents = serde_json::to_vec_pretty(value)?;
        Ok(self.add_bytes(archive_path, contents))
    }

    /// Add a file from disk.
    pub fn add_file<P: AsRef<Path>>(self, source_path: P, archive_path: &str) -> BundleResult<Self> {
        let source_path = source_path.as_ref();
        let contents = fs::read(source_path).map_err(|e| {
            BundleError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", source_path.display(), e),
            ))
        })?;
        Ok(self.add_bytes(archive_path, contents))
    }

    /// Number of objects added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write the archive into `writer`.
    pub fn write_to<W: Write + Seek>(self, writer: W) -> BundleResult<W> {
        let mut zip = ZipWriter::new(writer);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for file in &self.files {
            zip.start_file(file.archive_path.as_str(), options)?;
            zip.write_all(&file.contents)?;
        }

        Ok(zip.finish()?)
    }

    /// Build the archive in memory.
    pub fn to_bytes(self) -> BundleResult<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Write the archive to a file, creating parent directories.
    pub fn write<P: AsRef<Path>>(self, output_path: P) -> BundleResult<()> {
        let output_path = output_path.as_ref();
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(output_path)?;
        self.write_to(file)?;
        Ok(())
    }
}

/// Builds a hash list from a platform's build output directory.
///
/// Every regular file is a bundle except companion manifests (`*.manifest`)
/// and the hash-list file itself. The bundle named `master` becomes the
/// platform master.
#[derive(Debug, Clone)]
pub struct HashListBuilder {
    master: String,
    source_revision: String,
    exclude: Vec<String>,
}

impl HashListBuilder {
    #[must_use]
    pub fn new(master: &str, source_revision: &str) -> Self {
        Self {
            master: master.to_string(),
            source_revision: source_revision.to_string(),
            exclude: Vec::new(),
        }
    }

    /// Skip a file name, typically the hash-list file.
    #[must_use]
    pub fn exclude(mut self, file_name: &str) -> Self {
        self.exclude.push(file_name.to_string());
        self
    }

    /// Scan `dir` and build the list.
    pub fn build<P: AsRef<Path>>(&self, dir: P) -> BundleResult<BundleHashList> {
        let dir = dir.as_ref();
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.exclude.contains(&name) || is_companion(&name) {
                continue;
            }
            names.push(name);
        }
        names.sort();

        if !names.contains(&self.master) {
            return Err(BundleError::MissingFile(format!(
                "master bundle {} not found in {}",
                self.master,
                dir.display()
            )));
        }

        let master = describe(dir, &self.master)?;
        let mut list = BundleHashList::new(&self.source_revision, master);
        for name in names.iter().filter(|n| **n != self.master) {
            list.add_asset(describe(dir, name)?);
        }

        tracing::info!(
            dir = %dir.display(),
            bundles = list.assets.len() + 1,
            "built hash list"
        );
        Ok(list)
    }
}

fn is_companion(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == COMPANION_EXTENSION)
}

/// Size, SHA-256 and CRC32 of one bundle, plus its companion if present.
fn describe(dir: &Path, name: &str) -> BundleResult<BundleInfo> {
    let bytes = fs::read(dir.join(name))?;
    let mut info = BundleInfo::new(
        name,
        bytes.len() as u64,
        &compute_sha256(&bytes),
        compute_crc32(&bytes),
    );

    let companion = format!("{name}.{COMPANION_EXTENSION}");
    if let Ok(meta) = fs::metadata(dir.join(&companion)) {
        info = info.with_companion(&companion, meta.len());
    }
    Ok(info)
}

/// Copy `src` to `dst` recursively, encrypting bundle files.
///
/// Companion manifests and files named in `plain` are copied unchanged.
/// Returns the number of files encrypted.
pub fn write_encrypted_mirror<P, Q>(
    src: P,
    dst: Q,
    ctx: &CipherContext,
    plain: &[&str],
) -> BundleResult<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (src, dst) = (src.as_ref(), dst.as_ref());
    fs::create_dir_all(dst)?;

    let mut encrypted = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());

        if file_type.is_dir() {
            encrypted += write_encrypted_mirror(entry.path(), &target, ctx, plain)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if is_companion(&name) || plain.contains(&name.as_str()) {
            fs::copy(entry.path(), &target)?;
            continue;
        }

        let contents = fs::read(entry.path())?;
        let mut stream = SeekableCipherStream::new(File::create(&target)?, ctx)?;
        stream.write_all(&contents)?;
        stream.flush()?;
        encrypted += 1;
    }

    Ok(encrypted)
}

/// Compute SHA256 hash of data and return as hex string.
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Verify SHA256 checksum of data.
pub fn verify_sha256(data: &[u8], expected: &str) -> bool {
    let actual = compute_sha256(data);

    // Handle both "sha256:xxx" and raw "xxx" formats
    let expected_hex = expected.strip_prefix("sha256:").unwrap_or(expected);

    actual.eq_ignore_ascii_case(expected_hex)
}

/// CRC32 (IEEE) of data.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
