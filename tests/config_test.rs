//! Integration tests for configuration loading.

use mp4read::config::{load_config, load_config_or_default};
use std::fs;
use tempfile::tempdir;

#[test]
fn load_full_config() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("mp4read.toml");
    fs::write(
        &path,
        r#"
[reader]
max_sample_size = 8388608
read_buffer_size = 65536
track = 2
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.reader.max_sample_size, 8 * 1024 * 1024);
    assert_eq!(config.reader.read_buffer_size, 65536);
    assert_eq!(config.reader.track, Some(2));
}

#[test]
fn load_explicit_path_wins() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("custom.toml");
    fs::write(&path, "[reader]\ntrack = 7\n").unwrap();

    let config = load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.reader.track, Some(7));
    assert_eq!(config.reader.max_sample_size, 4 * 1024 * 1024);
}

#[test]
fn missing_file_is_an_error() {
    let temp = tempdir().unwrap();
    let err = load_config(&temp.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn malformed_file_is_an_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bad.toml");
    fs::write(&path, "[reader\nmax_sample_size = ").unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn zero_sample_size_is_rejected() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("zero.toml");
    fs::write(&path, "[reader]\nmax_sample_size = 0\n").unwrap();

    assert!(load_config(&path).is_err());
}
