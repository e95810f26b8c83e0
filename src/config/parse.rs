use super::types::*;
use crate::config::{expand_env_vars, ENV_VAR_PATTERN};
use regex::Regex;
use std::fs::File;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Largest batch size the validator allows, in bytes
const MAX_CONFIGURABLE_BYTES: usize = 1024 * 1024;

/// Largest event count the validator allows
const MAX_CONFIGURABLE_EVENTS: usize = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parses and validates config text, expanding `$env{...}` references first
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    let config: Config = serde_yaml::from_str(&yaml)?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(ENV_VAR_PATTERN).expect("env var pattern is valid");
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded_vars.join(", ")
    )))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_remote(&config.remote, &mut errors);
    validate_batching(&config.batching, &mut errors);

    if let Some(status) = &config.status {
        if status.listen.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "status.listen: '{}' is not a valid socket address",
                status.listen
            ));
        }
    }

    if let Some(group) = &config.destination.group {
        if group.trim().is_empty() {
            errors.push("destination.group: must not be empty".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_remote(remote: &RemoteConfig, errors: &mut Vec<String>) {
    if !(remote.endpoint.starts_with("http://") || remote.endpoint.starts_with("https://")) {
        errors.push(format!(
            "remote.endpoint: '{}' must start with http:// or https://",
            remote.endpoint
        ));
    }
    if remote.request_timeout == Duration::ZERO {
        errors.push("remote.request_timeout: must be greater than zero".to_string());
    }
    if remote.call_timeout == Duration::ZERO {
        errors.push("remote.call_timeout: must be greater than zero".to_string());
    }
}

fn validate_batching(batching: &BatchingConfig, errors: &mut Vec<String>) {
    if batching.max_events == 0 || batching.max_events > MAX_CONFIGURABLE_EVENTS {
        errors.push(format!(
            "batching.max_events: {} is outside 1..={}",
            batching.max_events, MAX_CONFIGURABLE_EVENTS
        ));
    }
    if batching.max_bytes <= batching.event_overhead {
        errors.push(format!(
            "batching.max_bytes: {} must exceed event_overhead ({})",
            batching.max_bytes, batching.event_overhead
        ));
    }
    if batching.max_bytes > MAX_CONFIGURABLE_BYTES {
        errors.push(format!(
            "batching.max_bytes: {} exceeds {}",
            batching.max_bytes, MAX_CONFIGURABLE_BYTES
        ));
    }
    if batching.sweep_interval == Duration::ZERO {
        errors.push("batching.sweep_interval: must be greater than zero".to_string());
    }
}
