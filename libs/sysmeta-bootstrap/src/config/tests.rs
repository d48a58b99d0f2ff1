use super::*;
use crate::{AppConfigProvider, ConfigProvider};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.system.current, "ts");
    assert!(config.system.extra_systems.is_empty());
    assert!(config.snapshots.is_empty());

    let logging = config.logging.as_ref().unwrap();
    let default = logging.get("default").unwrap();
    assert_eq!(default.console_level, "info");
    assert!(default.file.is_empty());

    assert!(config.modules.is_empty());
}

#[test]
fn test_yaml_serialization() {
    let config = AppConfig::default();
    let yaml = config.to_yaml().expect("Failed to serialize to YAML");

    assert!(yaml.contains("system:"));
    assert!(yaml.contains("current: ts"));
    assert!(yaml.contains("logging:"));
    assert!(yaml.contains("modules:"));
}

#[test]
fn test_layered_loading_yaml_only() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("test-config.yaml");

    let yaml_content = r#"
system:
  current: "hs"
  extra_systems: ["lab-cluster"]

snapshots:
  hs: "snapshots/hotel.yaml"

modules:
  resource_lookup:
    namespace: "hotel"
    denied_addresses: ["rabbitmq", "memcached"]
"#;

    fs::write(&config_path, yaml_content).expect("Failed to write config file");

    let config = AppConfig::load_layered(&config_path).expect("Failed to load config");

    assert_eq!(config.system.current, "hs");
    assert_eq!(config.system.extra_systems, vec!["lab-cluster".to_string()]);
    assert_eq!(
        config.snapshots.get("hs").map(|p| p.to_string_lossy().into_owned()),
        Some("snapshots/hotel.yaml".to_string())
    );
    // Logging stays None unless the file provides it.
    assert!(config.logging.is_none());

    let lookup = config.modules.get("resource_lookup").unwrap();
    assert_eq!(lookup["namespace"], "hotel");
}

#[test]
fn test_layered_loading_keeps_defaults_for_missing_sections() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("minimal.yaml");
    fs::write(&config_path, "modules: {}\n").unwrap();

    let config = AppConfig::load_layered(&config_path).unwrap();
    assert_eq!(config.system.current, "ts");
    assert!(config.snapshots.is_empty());
}

#[test]
fn test_unknown_top_level_key_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("bad.yaml");
    fs::write(&config_path, "sytem:\n  current: hs\n").unwrap();

    assert!(AppConfig::load_layered(&config_path).is_err());
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let err = AppConfig::load_layered(temp_dir.path().join("nope.yaml")).unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[test]
fn test_load_or_default_without_path() {
    let config = AppConfig::load_or_default(None::<&str>).unwrap();
    assert_eq!(config.system.current, "ts");
    assert!(config.logging.is_some());
}

#[test]
fn test_cli_overrides() {
    let mut config = AppConfig::default();

    let args = CliArgs {
        system: Some("sn".to_string()),
        verbose: 2,
    };

    config.apply_cli_overrides(&args);

    assert_eq!(config.system.current, "sn");
    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging.get("default").unwrap().console_level, "trace");
}

#[test]
fn test_cli_overrides_keep_level_without_verbose_flags() {
    let mut config = AppConfig::default();
    config.apply_cli_overrides(&CliArgs::default());

    assert_eq!(config.system.current, "ts");
    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging.get("default").unwrap().console_level, "info");
}

#[test]
fn test_config_provider_exposes_module_sections() {
    let mut config = AppConfig::default();
    config.modules.insert(
        "resource_lookup".to_string(),
        serde_json::json!({ "namespace": "ts" }),
    );

    let provider = AppConfigProvider::new(config);
    assert_eq!(
        provider.get_module_config("resource_lookup").unwrap()["namespace"],
        "ts"
    );
    assert!(provider.get_module_config("missing").is_none());
}
