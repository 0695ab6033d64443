use std::fs;
use std::path::PathBuf;

use convergectl_core::config::{Config, Profile};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// 1. Missing config directory / nonexistent path
// ---------------------------------------------------------------------------

#[test]
fn load_from_nonexistent_path_returns_default_config() {
    let path = PathBuf::from("/tmp/convergectl-test-nonexistent/does/not/exist/config.toml");
    assert!(!path.exists());

    let config = Config::load_from_path(&path).expect("should not panic or error on missing path");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

// ---------------------------------------------------------------------------
// 2. Empty config file
// ---------------------------------------------------------------------------

#[test]
fn load_empty_config_file_returns_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let config = Config::load_from_path(&config_path).expect("empty file should parse as default");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

// ---------------------------------------------------------------------------
// 3. Corrupt / invalid TOML
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_toml_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[[[broken").unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(result.is_err(), "corrupt TOML should produce an error");

    let err = result.unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("Parse"),
        "error should mention parsing: {msg}"
    );
}

// ---------------------------------------------------------------------------
// 4. Partial config (profile missing required fields)
// ---------------------------------------------------------------------------

#[test]
fn load_profile_missing_required_fields_fails() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[profiles.broken]
api_url = "https://wh.example.com/v1"
"#,
    )
    .unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(result.is_err(), "profile without api_key should not parse");
}

// ---------------------------------------------------------------------------
// 5. Save and reload round trip
// ---------------------------------------------------------------------------

#[test]
fn save_and_reload_round_trips() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set_profile(
        "prod".to_string(),
        Profile {
            api_url: "https://wh.example.com/v1".to_string(),
            api_key: "secret".to_string(),
            insecure: false,
        },
    );
    config.default_profile = Some("prod".to_string());

    config
        .save_to_path(&config_path)
        .expect("save should create parent directories");

    let restored = Config::load_from_path(&config_path).unwrap();
    assert_eq!(restored.default_profile.as_deref(), Some("prod"));
    let profile = restored.profiles.get("prod").unwrap();
    assert_eq!(profile.api_url, "https://wh.example.com/v1");
    assert_eq!(profile.api_key, "secret");
    assert!(!profile.insecure);
}

// ---------------------------------------------------------------------------
// 6. Unknown top-level keys are tolerated
// ---------------------------------------------------------------------------

#[test]
fn unknown_keys_do_not_break_loading() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
future_option = true

[profiles.prod]
api_url = "https://wh.example.com/v1"
api_key = "secret"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert_eq!(config.profiles.len(), 1);
}
