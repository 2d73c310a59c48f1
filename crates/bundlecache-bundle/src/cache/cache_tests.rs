#![allow(non_snake_case)]

use super::*;
use crate::cipher::SeekableCipherStream;
use std::io::Write;
use tempfile::TempDir;
use test_case::test_case;

const KEY: &str = "0123456789abcdef0123456789abcdef";
const IV: &str = "fedcba9876543210";

fn write_file(cache: &BundleCache, name: &str, len: usize) {
    fs::create_dir_all(cache.platform_dir()).unwrap();
    fs::write(cache.bundle_path(name), vec![7u8; len]).unwrap();
}

fn entry(name: &str, size: u64) -> BundleInfo {
    BundleInfo::new(name, size, "", 0).with_companion(&format!("{name}.manifest"), 4)
}

/// Cache holding the master, `A` (100 bytes) and `B` (150 bytes) plus companions.
fn populated_cache(dir: &TempDir) -> BundleCache {
    let cache = BundleCache::new(dir.path(), Platform::Android);
    for (name, len) in [("master", 10), ("A", 100), ("B", 150)] {
        write_file(&cache, name, len);
        write_file(&cache, &format!("{name}.manifest"), 4);
    }
    cache
}

fn list(a: u64, b: u64) -> BundleHashList {
    let mut list = BundleHashList::new("r1", entry("master", 10));
    list.add_asset(entry("A", a));
    list.add_asset(entry("B", b));
    list
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn BundleCache___paths___use_platform_dir_name() {
    let cache = BundleCache::new("/cache", Platform::MacOs);

    assert_eq!(cache.platform_dir(), PathBuf::from("/cache/OSX"));
    assert_eq!(cache.bundle_path("ui"), PathBuf::from("/cache/OSX/ui"));
    assert_eq!(
        cache.hash_list_path("bundlehash.json"),
        PathBuf::from("/cache/OSX/bundlehash.json")
    );
}

// ============================================================================
// compute_diff
// ============================================================================

#[test_case(100, 150 => Vec::<String>::new() ; "exact sizes")]
#[test_case(100, 200 => vec!["B".to_string()] ; "larger in list")]
#[test_case(90, 150 => vec!["A".to_string()] ; "smaller in list")]
#[test_case(99, 151 => vec!["A".to_string(), "B".to_string()] ; "both differ")]
fn BundleCache___compute_diff___compares_sizes(a: u64, b: u64) -> Vec<String> {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);

    cache.compute_diff(&list(a, b))
}

#[test]
fn BundleCache___compute_diff___missing_files___lists_bundle_and_companion() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let mut list = list(100, 150);
    list.add_asset(entry("C", 5));

    let diff = cache.compute_diff(&list);

    assert_eq!(diff, vec!["C".to_string(), "C.manifest".to_string()]);
}

#[test]
fn BundleCache___compute_diff___empty_cache___master_first() {
    let dir = TempDir::new().unwrap();
    let cache = BundleCache::new(dir.path(), Platform::Android);

    let diff = cache.compute_diff(&list(100, 150));

    assert_eq!(
        diff,
        vec!["master", "master.manifest", "A", "A.manifest", "B", "B.manifest"]
    );
}

#[test]
fn BundleCache___compute_diff___ignores_content_changes() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let mut list = list(100, 150);
    list.assets.get_mut("A").unwrap().content_hash = "not-the-real-hash".to_string();

    assert!(cache.compute_diff(&list).is_empty());
}

// ============================================================================
// read_bundle / verify_entry
// ============================================================================

#[test]
fn BundleCache___read_bundle___missing_file___returns_missing_file() {
    let dir = TempDir::new().unwrap();
    let cache = BundleCache::new(dir.path(), Platform::Linux);

    let result = cache.read_bundle("nope", None, |_| {});

    assert!(matches!(result, Err(BundleError::MissingFile(_))));
}

#[test]
fn BundleCache___read_bundle___empty_file___returns_empty_bundle() {
    let dir = TempDir::new().unwrap();
    let cache = BundleCache::new(dir.path(), Platform::Linux);
    write_file(&cache, "empty", 0);

    let result = cache.read_bundle("empty", None, |_| {});

    assert!(matches!(result, Err(BundleError::EmptyBundle(_))));
}

#[test]
fn BundleCache___read_bundle___reports_progress() {
    let dir = TempDir::new().unwrap();
    let cache = BundleCache::new(dir.path(), Platform::Linux);
    write_file(&cache, "big", 200_000);
    let mut seen = Vec::new();

    let bytes = cache.read_bundle("big", None, |n| seen.push(n)).unwrap();

    assert_eq!(bytes.len(), 200_000);
    assert_eq!(seen.last().copied(), Some(200_000));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn BundleCache___read_bundle___decrypts_with_cipher() {
    let dir = TempDir::new().unwrap();
    let cache = BundleCache::new(dir.path(), Platform::Linux);
    let ctx = CipherContext::from_ascii(KEY, IV).unwrap();
    fs::create_dir_all(cache.platform_dir()).unwrap();
    let file = File::create(cache.bundle_path("secret")).unwrap();
    let mut stream = SeekableCipherStream::new(file, &ctx).unwrap();
    stream.write_all(b"plain bundle bytes").unwrap();
    drop(stream);

    let raw = fs::read(cache.bundle_path("secret")).unwrap();
    let bytes = cache.read_bundle("secret", Some(&ctx), |_| {}).unwrap();

    assert_ne!(raw, b"plain bundle bytes");
    assert_eq!(bytes, b"plain bundle bytes");
}

#[test]
fn BundleCache___verify_entry___accepts_matching_file() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let bytes = fs::read(cache.bundle_path("A")).unwrap();
    let info = BundleInfo::new("A", 100, &compute_sha256(&bytes), compute_crc32(&bytes))
        .with_companion("A.manifest", 4);

    assert!(cache.verify_entry(&info, None).is_ok());
}

#[test]
fn BundleCache___verify_entry___detects_crc_mismatch() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let info = BundleInfo::new("A", 100, "", 0xdead_beef).with_companion("A.manifest", 4);

    let result = cache.verify_entry(&info, None);

    assert!(matches!(result, Err(BundleError::CrcMismatch { .. })));
}

#[test]
fn BundleCache___verify_entry___detects_hash_mismatch() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);
    let info = BundleInfo::new("A", 100, &"0".repeat(64), 0).with_companion("A.manifest", 4);

    let result = cache.verify_entry(&info, None);

    assert!(matches!(result, Err(BundleError::ChecksumMismatch { .. })));
}

#[test]
fn BundleCache___verify_entry___detects_size_mismatch() {
    let dir = TempDir::new().unwrap();
    let cache = populated_cache(&dir);

    let result = cache.verify_entry(&entry("B", 200), None);

    assert!(matches!(result, Err(BundleError::ChecksumMismatch { .. })));
}

// ============================================================================
// clear
// ============================================================================

#[test]
fn BundleCache___clear___removes_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("cache");
    let cache = BundleCache::new(&root, Platform::Ios);
    write_file(&cache, "a", 3);

    cache.clear().unwrap();

    assert!(!root.exists());
}

#[test]
fn BundleCache___clear___missing_root___is_ok() {
    let dir = TempDir::new().unwrap();
    let cache = BundleCache::new(dir.path().join("never"), Platform::Ios);

    assert!(cache.clear().is_ok());
}
