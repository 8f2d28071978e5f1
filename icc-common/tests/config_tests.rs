//! Config file loading and resolution
//!
//! Tests that point XDG_CONFIG_HOME at a temporary directory are marked
//! #[serial] so they never race each other.

use icc_common::config::{
    load_file_config, ConfigOverrides, FileConfig, ServiceConfig, DATABASE_FILE_NAME,
};
use icc_common::Error;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;

#[test]
fn test_explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("moderation.toml");
    fs::write(
        &path,
        r#"
database_path = "/srv/icc/moderation.db"
bind_address = "0.0.0.0:5811"
admin_key = "file-key"
trust_gateway_headers = true
"#,
    )
    .unwrap();

    let file = load_file_config(Some(&path)).unwrap();
    assert_eq!(file.database_path, Some(PathBuf::from("/srv/icc/moderation.db")));
    assert_eq!(file.bind_address.as_deref(), Some("0.0.0.0:5811"));
    assert_eq!(file.admin_key.as_deref(), Some("file-key"));
    assert_eq!(file.trust_gateway_headers, Some(true));

    let config = ServiceConfig::resolve(ConfigOverrides::default(), file).unwrap();
    assert_eq!(config.bind_address.port(), 5811);
    assert!(config.trust_gateway_headers);
}

#[test]
fn test_partial_config_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("moderation.toml");
    fs::write(&path, "admin_key = \"only-key\"\n").unwrap();

    let file = load_file_config(Some(&path)).unwrap();
    let config = ServiceConfig::resolve(ConfigOverrides::default(), file).unwrap();

    assert_eq!(config.admin_key.as_deref(), Some("only-key"));
    assert!(config.database_path.ends_with(DATABASE_FILE_NAME));
    assert!(!config.trust_gateway_headers);
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_file_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("moderation.toml");
    fs::write(&path, "bind_address = [1, 2").unwrap();

    let err = load_file_config(Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_user_config_file_discovered() {
    let dir = tempfile::tempdir().unwrap();
    let icc_dir = dir.path().join("icc");
    fs::create_dir_all(&icc_dir).unwrap();
    fs::write(icc_dir.join("moderation.toml"), "bind_address = \"127.0.0.1:6000\"\n").unwrap();

    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir.path());
    let file = load_file_config(None);
    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(file.unwrap().bind_address.as_deref(), Some("127.0.0.1:6000"));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_no_config_file_yields_empty_config() {
    let dir = tempfile::tempdir().unwrap();

    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir.path());
    let file = load_file_config(None);
    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    // /etc/icc/moderation.toml is not expected on a test machine
    if !std::path::Path::new("/etc/icc/moderation.toml").exists() {
        assert_eq!(file.unwrap(), FileConfig::default());
    }
}
