//! Facade smoke test: build a cache with the re-exported helpers and load
//! through the prelude.

#![allow(non_snake_case)]

use bundlecache::prelude::*;
use bundlecache::{
    ArchiveBuilder, CipherContext, DEPENDENCY_MANIFEST_OBJECT, DependencyManifest,
    HashListBuilder, write_encrypted_mirror,
};
use std::path::Path;
use std::time::Duration;

const KEY: &str = "0123456789abcdef0123456789abcdef";
const IV: &str = "fedcba9876543210";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Level {
    name: String,
    enemies: u32,
}

fn build_cache(root: &Path) {
    let dir = root.join(Platform::Ios.dir_name());
    let manifest = DependencyManifest::new()
        .with_bundle("levels", ["shared"])
        .with_bundle("shared", Vec::<String>::new());
    let level = Level {
        name: "harbor".to_string(),
        enemies: 12,
    };

    ArchiveBuilder::new()
        .add_json(DEPENDENCY_MANIFEST_OBJECT, &manifest)
        .unwrap()
        .write(dir.join("master"))
        .unwrap();
    ArchiveBuilder::new()
        .add_json("harbor.json", &level)
        .unwrap()
        .write(dir.join("levels"))
        .unwrap();
    ArchiveBuilder::new()
        .add_bytes("palette.txt", b"blue".to_vec())
        .write(dir.join("shared"))
        .unwrap();

    HashListBuilder::new("master", "facade")
        .exclude("bundlehash.json")
        .build(&dir)
        .unwrap()
        .write_to(dir.join("bundlehash.json"))
        .unwrap();
}

#[tokio::test]
async fn prelude___encrypted_cache___loads_json_asset_with_dependency() {
    let plain = tempfile::tempdir().unwrap();
    let encrypted = tempfile::tempdir().unwrap();
    build_cache(plain.path());
    let ctx = CipherContext::from_ascii(KEY, IV).unwrap();
    write_encrypted_mirror(plain.path(), encrypted.path(), &ctx, &["bundlehash.json"]).unwrap();

    let config = CacheConfig::new()
        .with_platform("ios")
        .with_tick_interval(Duration::from_millis(1))
        .with_encryption(EncryptionConfig::raw(KEY, IV));
    let registry = BundleRegistry::with_archive_store(config);

    assert!(registry
        .setup(CancellationToken::new(), false, encrypted.path())
        .await
        .unwrap());
    let mut request = registry.load_asset::<Json<Level>>("levels", "harbor.json").unwrap();
    let level = tokio::time::timeout(Duration::from_secs(5), request.wait())
        .await
        .unwrap()
        .unwrap()
        .into_inner();

    assert_eq!(level.name, "harbor");
    assert_eq!(level.enemies, 12);
    assert!(registry.is_loaded("shared"));
    assert_eq!(registry.progress_status(), ProgressStatus::Ready);

    registry.shutdown().await;
    assert!(!registry.is_init());
}
