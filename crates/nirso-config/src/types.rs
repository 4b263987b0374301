// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `nirso_configuration.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub inference: InferenceConfig,
    pub limits: LimitsConfig,
}

/// HTTP API bind settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host, IPv4 address or FQDN
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Shared-secret settings for device authentication
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Process-wide HMAC key shared with enrolled devices.
    /// Read once at startup, never rotated at runtime.
    pub shared_key: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            shared_key: String::new(),
        }
    }
}

/// Upstream inference endpoint (TensorFlow Serving REST surface)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// `http` or `https`
    pub protocol: String,
    /// IPv4 address or FQDN of the inference host
    pub host: String,
    pub port: u16,
    /// Model path without a leading slash, e.g. `v1/models/fabric:predict`
    pub path: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8501,
            path: "v1/models/fabric:predict".to_string(),
        }
    }
}

impl InferenceConfig {
    /// Fully constructed endpoint URL
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.protocol, self.host, self.port, self.path
        )
    }
}

/// Request rate limiting (fixed window, per client address)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub rate_window_secs: u64,
    pub rate_max_requests: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: 120,
            rate_max_requests: 30,
        }
    }
}
