// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Nirso Relay REST API Layer
//
// This crate provides the device-session relay core: payload validation,
// keyed-signature authentication, the in-memory device registry, and the
// streaming proxy to the external inference endpoint.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod common;
pub mod device;
pub mod endpoints;
pub mod middleware;
pub mod openapi;
pub mod relay;
pub mod security;
pub mod server;
pub mod validation;

// Re-export commonly used types
pub use common::{ApiError, ApiResult, MsgResponse};
pub use device::{DeviceRegistry, DeviceSession};
pub use relay::InferenceRelay;
pub use security::SignatureValidator;
pub use server::{create_http_server, ApiState};
