#![allow(non_snake_case)]

use super::*;
use std::time::Duration;
use test_case::test_case;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn loaded(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// dependency_state
// ============================================================================

#[test_case(&[], &[], &[] => DependencyLoad::NoTargets ; "no dependencies")]
#[test_case(&["Y", "Z"], &["Y"], &[] => DependencyLoad::LoadWait ; "one still loading")]
#[test_case(&["Y", "Z"], &["Y", "Z"], &[] => DependencyLoad::Success ; "all loaded")]
#[test_case(&["Y", "Z"], &["Y"], &["Z"] => DependencyLoad::Failed ; "one failed")]
#[test_case(&["Y"], &["Y"], &["Y"] => DependencyLoad::Failed ; "error wins over loaded")]
fn dependency_state___aggregates(deps: &[&str], done: &[&str], failed: &[&str]) -> DependencyLoad {
    let errors: HashMap<String, CacheError> = failed
        .iter()
        .map(|n| (n.to_string(), CacheError::IoError("missing".to_string())))
        .collect();

    dependency_state(&names(deps), &errors, &loaded(done))
}

// ============================================================================
// Before setup
// ============================================================================

fn registry() -> BundleRegistry {
    BundleRegistry::with_archive_store(CacheConfig::new().with_platform("linux"))
}

#[test]
fn BundleRegistry___new___is_idle_and_uninitialized() {
    let registry = registry();

    assert!(!registry.is_init());
    assert!(!registry.is_server_mode());
    assert!(!registry.is_diff_data());
    assert_eq!(registry.progress_status(), ProgressStatus::Idle);
    assert_eq!(registry.progress(), 0.0);
    assert!(registry.errors().is_empty());
    assert_eq!(registry.platform(), None);
}

#[test]
fn BundleRegistry___load_bundle_before_setup___not_initialized() {
    let registry = registry();

    let err = registry.load_bundle("ui").unwrap_err();

    assert_eq!(err, CacheError::NotInitialized);
}

#[test]
fn BundleRegistry___load_asset_before_setup___not_initialized() {
    let registry = registry();

    let err = registry.load_asset::<String>("ui", "title.txt").unwrap_err();

    assert_eq!(err, CacheError::NotInitialized);
}

#[test]
fn BundleRegistry___unload_before_setup___not_initialized() {
    let registry = registry();

    assert_eq!(registry.unload_bundle("ui"), Err(CacheError::NotInitialized));
    assert_eq!(registry.unload_bundle(""), Err(CacheError::NotInitialized));
}

#[test]
fn BundleRegistry___clear_cache_before_setup___not_initialized() {
    let registry = registry();

    assert_eq!(registry.clear_cache(), Err(CacheError::NotInitialized));
}

#[test]
fn BundleRegistry___reload_before_setup___not_initialized() {
    let registry = registry();

    assert_eq!(registry.reload_hash_lists(), Err(CacheError::NotInitialized));
}

#[test]
fn BundleRegistry___tick_before_setup___is_noop() {
    let registry = registry();

    registry.tick();

    assert_eq!(registry.in_flight_count(), 0);
}

#[tokio::test]
async fn BundleRegistry___setup_with_cancelled_token___returns_cancelled() {
    let registry = registry();
    let token = CancellationToken::new();
    token.cancel();

    let result = registry.setup(token, false, "unused").await;

    assert_eq!(result, Err(CacheError::Cancelled));
    assert!(!registry.is_init());
}

#[tokio::test]
async fn BundleRegistry___setup_with_bad_platform___returns_false() {
    let registry = BundleRegistry::with_archive_store(CacheConfig::new().with_platform("amiga"));

    let ok = registry
        .setup(CancellationToken::new(), false, "unused")
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(registry.progress_status(), ProgressStatus::Failed);
}

#[tokio::test]
async fn BundleRegistry___setup_with_short_key___returns_false() {
    let config = CacheConfig::new()
        .with_platform("linux")
        .with_encryption(bundlecache_core::EncryptionConfig::raw("short", "fedcba9876543210"));
    let registry = BundleRegistry::with_archive_store(config);

    let ok = registry
        .setup(CancellationToken::new(), false, "unused")
        .await
        .unwrap();

    assert!(!ok);
    assert!(!registry.is_init());
}

#[tokio::test]
async fn BundleRegistry___setup_without_hash_list___returns_false() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();

    let ok = registry
        .setup(CancellationToken::new(), false, dir.path())
        .await
        .unwrap();

    assert!(!ok);
    assert!(!registry.is_init());
    assert_eq!(registry.progress_status(), ProgressStatus::Failed);
}

// ============================================================================
// Cancellation
// ============================================================================

/// Master plus one plain bundle "ui" for the Linux platform.
fn write_cache(root: &Path) {
    use bundlecache_bundle::{ArchiveBuilder, HashListBuilder};

    let dir = root.join(Platform::Linux.dir_name());
    let manifest = DependencyManifest::new().with_bundle("ui", Vec::<String>::new());
    ArchiveBuilder::new()
        .add_json(DEPENDENCY_MANIFEST_OBJECT, &manifest)
        .unwrap()
        .write(dir.join("master"))
        .unwrap();
    ArchiveBuilder::new()
        .add_bytes("title.txt", b"hello".to_vec())
        .write(dir.join("ui"))
        .unwrap();
    HashListBuilder::new("master", "r1")
        .exclude("bundlehash.json")
        .build(&dir)
        .unwrap()
        .write_to(dir.join("bundlehash.json"))
        .unwrap();
}

fn ticking_registry() -> BundleRegistry {
    BundleRegistry::with_archive_store(
        CacheConfig::new()
            .with_platform("linux")
            .with_tick_interval(Duration::from_millis(1)),
    )
}

#[tokio::test]
async fn BundleRegistry___cancel_of_replaced_session___leaves_current_session_running() {
    let dir = tempfile::tempdir().unwrap();
    write_cache(dir.path());
    let registry = ticking_registry();
    assert!(registry.setup(CancellationToken::new(), false, dir.path()).await.unwrap());
    registry.clear_cache().unwrap();
    write_cache(dir.path());
    assert!(registry.setup(CancellationToken::new(), false, dir.path()).await.unwrap());

    // The loop of the cleared session may still wake after the new setup.
    registry.inner.on_cancel();

    assert!(registry.is_init());
    let mut request = registry.load_asset::<String>("ui", "title.txt").unwrap();
    let text = tokio::time::timeout(Duration::from_secs(5), request.wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(text, "hello");
}

#[tokio::test]
async fn BundleRegistry___on_cancel_for_cancelled_session___tears_down() {
    let dir = tempfile::tempdir().unwrap();
    write_cache(dir.path());
    let registry = ticking_registry();
    let token = CancellationToken::new();
    assert!(registry.setup(token.clone(), false, dir.path()).await.unwrap());
    let _request = registry.load_bundle("ui").unwrap();

    token.cancel();
    registry.inner.on_cancel();

    assert!(!registry.is_init());
    assert_eq!(registry.progress_status(), ProgressStatus::Idle);
    assert_eq!(registry.in_flight_count(), 0);
    assert_eq!(registry.errors().get("ui"), Some(&CacheError::Cancelled));
    assert_eq!(registry.load_bundle("ui").unwrap_err(), CacheError::NotInitialized);
}

// ============================================================================
// Platform helpers
// ============================================================================

#[test]
fn configured_platforms___includes_active_once() {
    let mut config = CacheConfig::new();
    config.platforms = names(&["android", "linux", "ios"]);

    let platforms = configured_platforms(&config, Platform::Linux).unwrap();

    assert_eq!(
        platforms,
        vec![Platform::Linux, Platform::Android, Platform::Ios]
    );
}

#[test]
fn configured_platforms___unknown_key___config_error() {
    let mut config = CacheConfig::new();
    config.platforms = names(&["dreamcast"]);

    let err = configured_platforms(&config, Platform::Linux).unwrap_err();

    assert!(matches!(err, CacheError::ConfigError(_)));
}

#[test]
fn active_platform___explicit_key___parsed() {
    let config = CacheConfig::new().with_platform("android");

    assert_eq!(active_platform(&config).unwrap(), Platform::Android);
}
