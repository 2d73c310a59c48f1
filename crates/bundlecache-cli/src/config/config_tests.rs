#![allow(non_snake_case)]

use super::*;
use bundlecache_core::EncryptionConfig;

#[test]
fn from_str___full_config___parses_all_sections() {
    let toml = r#"
platform = "android"
platforms = ["android", "ios"]
hash_file_name = "assets"
max_retries = 2
timeout_ms = 5000
active_variants = ["hd"]

[encryption]
mode = "raw"
key = "0123456789abcdef0123456789abcdef"
iv = "fedcba9876543210"
"#;

    let config = from_str(toml).unwrap();

    assert_eq!(config.platform.as_deref(), Some("android"));
    assert_eq!(config.platforms, vec!["android", "ios"]);
    assert_eq!(config.hash_file(), "assets.json");
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.timeout_ms, 5000);
    assert_eq!(config.active_variants, vec!["hd"]);
    assert!(matches!(config.encryption, EncryptionConfig::Raw { .. }));
}

#[test]
fn from_str___empty___defaults() {
    let config = from_str("").unwrap();

    assert_eq!(config, CacheConfig::default());
}

#[test]
fn from_str___password_mode___default_iterations() {
    let toml = r#"
[encryption]
mode = "password"
password = "hunter2"
salt = "saltsalt"
"#;

    let config = from_str(toml).unwrap();

    assert_eq!(
        config.encryption,
        EncryptionConfig::Password {
            password: "hunter2".to_string(),
            salt: "saltsalt".to_string(),
            iterations: 1000,
        }
    );
}

#[test]
fn from_str___short_key___rejected() {
    let toml = r#"
[encryption]
mode = "raw"
key = "short"
iv = "fedcba9876543210"
"#;

    let result = from_str(toml);

    assert!(result.is_err());
}

#[test]
fn from_str___invalid_toml___rejected() {
    assert!(from_str("platform = ").is_err());
}

#[test]
fn load___no_path___defaults() {
    let config = load(None).unwrap();

    assert_eq!(config.hash_file(), "bundlehash.json");
}

#[test]
fn load___missing_file___error_names_path() {
    let err = load(Some(Path::new("/nonexistent/bundlecache.toml"))).unwrap_err();

    assert!(err.to_string().contains("bundlecache.toml"));
}

#[test]
fn platform___argument_overrides_config() {
    let config = CacheConfig::new().with_platform("ios");

    assert_eq!(platform(&config, Some("android")).unwrap(), Platform::Android);
    assert_eq!(platform(&config, None).unwrap(), Platform::Ios);
}

#[test]
fn platform___unknown_key___lists_known_platforms() {
    let err = platform(&CacheConfig::default(), Some("amiga")).unwrap_err();

    let message = err.to_string();
    assert!(message.contains("amiga"));
    assert!(message.contains("android"));
}
