//! Integration tests for the bundlecache binary.
//!
//! Each test builds a small platform directory of ZIP bundles and drives the
//! CLI against it.

#![allow(non_snake_case)]

use bundlecache_bundle::{ArchiveBuilder, BundleHashList, Platform};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const KEY: &str = "0123456789abcdef0123456789abcdef";
const IV: &str = "fedcba9876543210";

fn bundlecache(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bundlecache"))
        .args(args)
        .output()
        .expect("failed to run bundlecache")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Cache root with a master and two bundles for Android, without a hash list.
fn create_build(root: &Path) -> PathBuf {
    let dir = root.join(Platform::Android.dir_name());
    for (name, text) in [("master", "{}"), ("ui", "buttons"), ("audio", "sounds")] {
        ArchiveBuilder::new()
            .add_bytes("content.txt", text.as_bytes().to_vec())
            .write(dir.join(name))
            .unwrap();
        fs::write(dir.join(format!("{name}.manifest")), "manifest").unwrap();
    }
    dir
}

fn hashed_build(root: &Path) -> PathBuf {
    let dir = create_build(root);
    let output = bundlecache(&["hash", path_arg(&dir), "--revision", "r42"]);
    assert!(output.status.success(), "hash failed: {output:?}");
    dir
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("bundlecache.toml");
    fs::write(
        &path,
        format!("platform = \"android\"\n\n[encryption]\nmode = \"raw\"\nkey = \"{KEY}\"\niv = \"{IV}\"\n"),
    )
    .unwrap();
    path
}

// =============================================================================
// hash / inspect
// =============================================================================

mod hash {
    use super::*;

    #[test]
    fn hash___build_dir___writes_hash_list() {
        let temp = TempDir::new().unwrap();
        let dir = hashed_build(temp.path());

        let list = BundleHashList::read_from(dir.join("bundlehash.json")).unwrap();

        assert_eq!(list.source_revision, "r42");
        assert_eq!(list.platform_master.name, "master");
        assert_eq!(list.assets.len(), 2);
        assert_eq!(list.get_asset("ui").manifest_companion_size, 8);
    }

    #[test]
    fn hash___missing_master___fails() {
        let temp = TempDir::new().unwrap();
        let dir = create_build(temp.path());

        let output = bundlecache(&["hash", path_arg(&dir), "--revision", "r1", "--master", "absent"]);

        assert!(!output.status.success());
    }

    #[test]
    fn inspect___hash_list___prints_summary() {
        let temp = TempDir::new().unwrap();
        let dir = hashed_build(temp.path());

        let output = bundlecache(&["inspect", path_arg(&dir.join("bundlehash.json"))]);

        assert!(output.status.success());
        let text = stdout(&output);
        assert!(text.contains("Revision: r42"));
        assert!(text.contains("audio"));
        assert!(text.contains("ui"));
    }

    #[test]
    fn inspect___json_flag___prints_parseable_json() {
        let temp = TempDir::new().unwrap();
        let dir = hashed_build(temp.path());

        let output = bundlecache(&["inspect", "--json", path_arg(&dir.join("bundlehash.json"))]);

        let list = BundleHashList::from_json(&stdout(&output)).unwrap();
        assert_eq!(list.assets.len(), 2);
    }
}

// =============================================================================
// diff / verify
// =============================================================================

mod check {
    use super::*;

    #[test]
    fn diff___matching_cache___up_to_date() {
        let temp = TempDir::new().unwrap();
        hashed_build(temp.path());

        let output = bundlecache(&["diff", path_arg(temp.path()), "--platform", "android", "--check"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("up to date"));
    }

    #[test]
    fn diff___resized_bundle___listed_and_check_fails() {
        let temp = TempDir::new().unwrap();
        let dir = hashed_build(temp.path());
        fs::write(dir.join("audio"), b"x").unwrap();

        let output = bundlecache(&["diff", path_arg(temp.path()), "--platform", "android", "--check"]);

        assert!(!output.status.success());
        assert!(stdout(&output).contains("audio"));
    }

    #[test]
    fn verify___intact_cache___succeeds() {
        let temp = TempDir::new().unwrap();
        hashed_build(temp.path());

        let output = bundlecache(&["verify", path_arg(temp.path()), "--platform", "android"]);

        assert!(output.status.success(), "{output:?}");
        assert!(stdout(&output).contains("All bundles verified"));
    }

    #[test]
    fn verify___same_size_corruption___fails() {
        let temp = TempDir::new().unwrap();
        let dir = hashed_build(temp.path());
        let mut bytes = fs::read(dir.join("ui")).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(dir.join("ui"), bytes).unwrap();

        let diff = bundlecache(&["diff", path_arg(temp.path()), "--platform", "android", "--check"]);
        let verify = bundlecache(&["verify", path_arg(temp.path()), "--platform", "android"]);

        assert!(diff.status.success());
        assert!(!verify.status.success());
        assert!(stdout(&verify).contains("FAILED  ui"));
    }

    #[test]
    fn diff___unknown_platform___fails() {
        let temp = TempDir::new().unwrap();

        let output = bundlecache(&["diff", path_arg(temp.path()), "--platform", "amiga"]);

        assert!(!output.status.success());
    }
}

// =============================================================================
// encrypt
// =============================================================================

mod encrypt {
    use super::*;

    #[test]
    fn encrypt___then_verify_with_key___succeeds() {
        let temp = TempDir::new().unwrap();
        let plain = temp.path().join("plain");
        let encrypted = temp.path().join("encrypted");
        let dir = hashed_build(&plain);
        let config = write_config(temp.path());

        let output = bundlecache(&[
            "encrypt",
            path_arg(&plain),
            path_arg(&encrypted),
            "--config",
            path_arg(&config),
        ]);
        assert!(output.status.success(), "{output:?}");

        let encrypted_dir = encrypted.join(Platform::Android.dir_name());
        assert_ne!(
            fs::read(encrypted_dir.join("ui")).unwrap(),
            fs::read(dir.join("ui")).unwrap()
        );
        assert_eq!(
            fs::read(encrypted_dir.join("ui.manifest")).unwrap(),
            fs::read(dir.join("ui.manifest")).unwrap()
        );
        assert_eq!(
            fs::read(encrypted_dir.join("bundlehash.json")).unwrap(),
            fs::read(dir.join("bundlehash.json")).unwrap()
        );

        let verify = bundlecache(&["verify", path_arg(&encrypted), "--config", path_arg(&config)]);
        assert!(verify.status.success(), "{verify:?}");

        let verify_without_key = bundlecache(&["verify", path_arg(&encrypted), "--platform", "android"]);
        assert!(!verify_without_key.status.success());
    }

    #[test]
    fn encrypt___config_without_encryption___fails() {
        let temp = TempDir::new().unwrap();
        let plain = temp.path().join("plain");
        hashed_build(&plain);
        let config = temp.path().join("plain.toml");
        fs::write(&config, "platform = \"android\"\n").unwrap();

        let output = bundlecache(&[
            "encrypt",
            path_arg(&plain),
            path_arg(&temp.path().join("out")),
            "--config",
            path_arg(&config),
        ]);

        assert!(!output.status.success());
    }

    #[test]
    fn encrypt___destination_inside_source___refused() {
        let temp = TempDir::new().unwrap();
        let plain = temp.path().join("plain");
        hashed_build(&plain);
        let config = write_config(temp.path());

        let output = bundlecache(&[
            "encrypt",
            path_arg(&plain),
            path_arg(&plain.join("nested")),
            "--config",
            path_arg(&config),
        ]);

        assert!(!output.status.success());
    }
}
