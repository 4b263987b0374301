// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Two-tier loading: the TOML file provides base defaults, environment
//! variables override individual values at runtime.

use crate::{ConfigError, ConfigResult, RelayConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the relay configuration file
///
/// Search order:
/// 1. `NIRSO_CONFIG_PATH` environment variable
/// 2. Current working directory: `./nirso_configuration.toml`
/// 3. Ancestor directories (up to 5 levels, for workspace checkouts)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("NIRSO_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by NIRSO_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join("nirso_configuration.toml"));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join("nirso_configuration.toml"));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Relay configuration file 'nirso_configuration.toml' not found in any of these locations:\n{}\n\nSet NIRSO_CONFIG_PATH environment variable to specify custom location.",
        search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(config_path: Option<&Path>) -> ConfigResult<RelayConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;

    let mut config: RelayConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NIRSO_API_HOST` -> `api.host`
/// - `NIRSO_API_PORT` -> `api.port`
/// - `NIRSO_SHARED_KEY` -> `security.shared_key`
/// - `NIRSO_INFERENCE_PROTOCOL` -> `inference.protocol`
/// - `NIRSO_INFERENCE_HOST` -> `inference.host`
/// - `NIRSO_INFERENCE_PORT` -> `inference.port`
/// - `NIRSO_INFERENCE_PATH` -> `inference.path`
pub fn apply_environment_overrides(config: &mut RelayConfig) {
    // API settings
    if let Ok(value) = env::var("NIRSO_API_HOST") {
        config.api.host = value;
    }
    if let Ok(value) = env::var("NIRSO_API_PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.api.port = port;
        }
    }

    // Security settings
    if let Ok(value) = env::var("NIRSO_SHARED_KEY") {
        config.security.shared_key = value;
    }

    // Inference endpoint settings
    if let Ok(value) = env::var("NIRSO_INFERENCE_PROTOCOL") {
        config.inference.protocol = value;
    }
    if let Ok(value) = env::var("NIRSO_INFERENCE_HOST") {
        config.inference.host = value;
    }
    if let Ok(value) = env::var("NIRSO_INFERENCE_PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.inference.port = port;
        }
    }
    if let Ok(value) = env::var("NIRSO_INFERENCE_PATH") {
        config.inference.path = value;
    }
}
