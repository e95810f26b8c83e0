use logship::config::{generate::generate_starter_config, load_config, ConfigError};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_generated_config_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(&config_path, generate_starter_config()).unwrap();

    let config = load_config(&config_path).expect("Generated config should be valid");

    assert_eq!(config.remote.endpoint, "http://127.0.0.1:4566");
    assert_eq!(config.batching.max_events, 1000);
    assert_eq!(config.batching.max_bytes, 32_768);
    assert_eq!(config.batching.sweep_interval, Duration::from_secs(10));
    assert!(config.destination.group.is_none());
}

#[test]
fn test_full_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let config_yaml = r#"
remote:
  endpoint: https://logs.internal:8443/
  request_timeout: 2s
  call_timeout: 1m
destination:
  group: payments
  stream_prefix: web-7
batching:
  max_events: 500
  max_bytes: 16384
  sweep_interval: 250ms
status:
  listen: 127.0.0.1:7105
"#;
    fs::write(&config_path, config_yaml).unwrap();

    let config = load_config(&config_path).unwrap();

    assert_eq!(config.remote.request_timeout, Duration::from_secs(2));
    assert_eq!(config.remote.call_timeout, Duration::from_secs(60));
    assert_eq!(config.destination.group.as_deref(), Some("payments"));
    assert_eq!(config.destination.stream_prefix.as_deref(), Some("web-7"));

    let limits = config.batching.limits();
    assert_eq!(limits.max_events, 500);
    assert_eq!(limits.max_bytes, 16_384);
    assert_eq!(limits.event_overhead, 28);
    assert_eq!(config.batching.sweep_interval, Duration::from_millis(250));
    assert_eq!(config.status.unwrap().listen, "127.0.0.1:7105");
}

#[test]
fn test_env_var_expansion_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    std::env::set_var("LOGSHIP_TEST_GROUP", "from-env");
    fs::write(
        &config_path,
        "remote:\n  endpoint: http://localhost:4566\ndestination:\n  group: $env{LOGSHIP_TEST_GROUP}\n",
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.destination.group.as_deref(), Some("from-env"));
}

#[test]
fn test_empty_group_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(
        &config_path,
        "remote:\n  endpoint: http://localhost:4566\ndestination:\n  group: '  '\n",
    )
    .unwrap();

    match load_config(&config_path) {
        Err(ConfigError::ValidationList(errors)) => {
            assert_eq!(errors, vec!["destination.group: must not be empty"]);
        }
        other => panic!("expected validation list, got {:?}", other),
    }
}

#[test]
fn test_oversized_batch_limit_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(
        &config_path,
        "remote:\n  endpoint: http://localhost:4566\nbatching:\n  max_bytes: 2000000\n",
    )
    .unwrap();

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("batching.max_bytes"));
}

#[test]
fn test_missing_file_names_path() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("absent.yml");

    match load_config(&config_path) {
        Err(ConfigError::Io(e)) => assert!(e.to_string().contains("absent.yml")),
        other => panic!("expected io error, got {:?}", other),
    }
}
