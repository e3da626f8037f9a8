//! Integration tests for config file discovery and TOML loading
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate the test env var are marked with #[serial].

use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::Path;
use tempfile::TempDir;
use wkmp_common::config::{load_toml_or_default, parse_toml, resolve_config_file};
use wkmp_common::Error;

const ENV_VAR: &str = "WKMP_COMMON_TEST_CONFIG";
const FILE_NAME: &str = "wkmp-common-test-nonexistent.toml";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct SampleConfig {
    delay_ms: u64,
    label: String,
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_config_file(Some(Path::new("/tmp/from-cli.toml")), ENV_VAR, FILE_NAME);
    env::remove_var(ENV_VAR);

    assert_eq!(resolved.unwrap(), Path::new("/tmp/from-cli.toml"));
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_config_file(None, ENV_VAR, FILE_NAME);
    env::remove_var(ENV_VAR);

    assert_eq!(resolved.unwrap(), Path::new("/tmp/from-env.toml"));
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    env::set_var(ENV_VAR, "");
    let resolved = resolve_config_file(None, ENV_VAR, FILE_NAME);
    env::remove_var(ENV_VAR);

    // No platform file by this name exists either
    assert!(resolved.is_none());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config: SampleConfig = load_toml_or_default(Some(&path)).unwrap();
    assert_eq!(config, SampleConfig::default());

    let config: SampleConfig = load_toml_or_default(None).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_existing_file_is_parsed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.toml");
    std::fs::write(&path, "delay_ms = 250\nlabel = \"replay\"\n").unwrap();

    let config: SampleConfig = load_toml_or_default(Some(&path)).unwrap();
    assert_eq!(config.delay_ms, 250);
    assert_eq!(config.label, "replay");
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "delay_ms = [not toml").unwrap();

    let result: Result<SampleConfig, Error> = load_toml_or_default(Some(&path));
    match result {
        Err(Error::Config(message)) => assert!(message.contains("broken.toml")),
        other => panic!("expected a config error, got {:?}", other),
    }
}

#[test]
fn test_parse_toml_maps_to_config_error() {
    let result: Result<SampleConfig, Error> = parse_toml("delay_ms = \"soon\"");
    assert!(matches!(result, Err(Error::Config(_))));
}
