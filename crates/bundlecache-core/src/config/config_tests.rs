#![allow(non_snake_case)]

use super::*;

const KEY: &str = "0123456789abcdef0123456789abcdef";
const IV: &str = "fedcba9876543210";

#[test]
fn CacheConfig___default___has_expected_values() {
    let config = CacheConfig::default();

    assert_eq!(config.hash_file_name, "bundlehash");
    assert_eq!(config.hash_file_extension, "json");
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert_eq!(config.tick_interval(), Duration::from_millis(16));
    assert_eq!(config.encryption, EncryptionConfig::None);
    assert!(config.platform.is_none());
    assert!(config.active_variants.is_empty());
}

#[test]
fn CacheConfig___from_empty_bytes___returns_defaults() {
    let config = CacheConfig::from_json(&[]).unwrap();

    assert_eq!(config, CacheConfig::default());
}

#[test]
fn CacheConfig___from_json___parses_raw_encryption() {
    let json = format!(r#"{{"encryption": {{"mode": "raw", "key": "{KEY}", "iv": "{IV}"}}}}"#);

    let config = CacheConfig::from_json(json.as_bytes()).unwrap();

    assert_eq!(config.encryption, EncryptionConfig::raw(KEY, IV));
    assert!(config.encryption.is_enabled());
}

#[test]
fn CacheConfig___from_json___parses_password_encryption_with_default_iterations() {
    let json = r#"{"encryption": {"mode": "password", "password": "pw", "salt": "saltsalt"}}"#;

    let config = CacheConfig::from_json(json.as_bytes()).unwrap();

    assert_eq!(
        config.encryption,
        EncryptionConfig::Password {
            password: "pw".into(),
            salt: "saltsalt".into(),
            iterations: 1000,
        }
    );
}

#[test]
fn CacheConfig___from_json___unknown_encryption_mode___fails() {
    let json = r#"{"encryption": {"mode": "rot13"}}"#;

    let result = CacheConfig::from_json(json.as_bytes());

    assert!(result.is_err());
}

#[test]
fn CacheConfig___hash_file___joins_name_and_extension() {
    let config = CacheConfig::default();

    assert_eq!(config.hash_file(), "bundlehash.json");
}

#[test]
fn CacheConfig___builder_chain___combines_options() {
    let config = CacheConfig::new()
        .with_platform("android")
        .with_max_retries(2)
        .with_timeout(Duration::from_millis(250))
        .with_tick_interval(Duration::from_millis(5))
        .with_active_variants(["hd", "sd"]);

    assert_eq!(config.platform.as_deref(), Some("android"));
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.timeout_ms, 250);
    assert_eq!(config.tick_interval_ms, 5);
    assert_eq!(config.active_variants, vec!["hd", "sd"]);
}

#[test]
fn CacheConfig___validate___accepts_defaults() {
    assert!(CacheConfig::default().validate().is_ok());
}

#[test]
fn CacheConfig___validate___rejects_zero_tick_interval() {
    let config = CacheConfig::new().with_tick_interval(Duration::ZERO);

    let result = config.validate();

    assert!(matches!(result, Err(CacheError::ConfigError(_))));
}

#[test]
fn CacheConfig___validate___rejects_empty_hash_file_name() {
    let mut config = CacheConfig::default();
    config.hash_file_name = String::new();

    let result = config.validate();

    assert!(result.unwrap_err().to_string().contains("hash_file_name"));
}

#[test]
fn EncryptionConfig___validate___accepts_exact_lengths() {
    assert!(EncryptionConfig::raw(KEY, IV).validate().is_ok());
}

#[test]
fn EncryptionConfig___validate___rejects_short_key() {
    let result = EncryptionConfig::raw("short", IV).validate();

    let err = result.unwrap_err();
    assert!(matches!(err, CacheError::ConfigError(_)));
    assert!(err.to_string().contains("key"));
}

#[test]
fn EncryptionConfig___validate___rejects_long_iv() {
    let result = EncryptionConfig::raw(KEY, "fedcba98765432100").validate();

    assert!(result.unwrap_err().to_string().contains("IV"));
}

#[test]
fn EncryptionConfig___validate___rejects_non_ascii_key() {
    // 32 bytes but not ASCII
    let key = "é".repeat(16);

    let result = EncryptionConfig::raw(key, IV).validate();

    assert!(result.is_err());
}

#[test]
fn EncryptionConfig___validate___rejects_short_salt() {
    let result = EncryptionConfig::password("pw", "salt").validate();

    assert!(result.unwrap_err().to_string().contains("salt"));
}

#[test]
fn EncryptionConfig___none___is_not_enabled() {
    assert!(!EncryptionConfig::None.is_enabled());
}
