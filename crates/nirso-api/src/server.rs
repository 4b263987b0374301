// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// HTTP server implementation (Axum)
//
// This module sets up the HTTP API router, including routing, middleware,
// and state management.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::common::MsgResponse;
use crate::device::DeviceRegistry;
use crate::middleware::cors::create_cors_layer;
use crate::middleware::logging::log_request_bodies;
use crate::middleware::rate_limit::{rate_limit, RateLimiter};
use crate::openapi::ApiDoc;
use crate::relay::InferenceRelay;
use crate::security::SignatureValidator;

/// Application state shared across all HTTP handlers
///
/// Constructed once at process start and passed by handle to every handler;
/// no ambient globals.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<DeviceRegistry>,
    pub signature: Arc<SignatureValidator>,
    pub relay: Arc<InferenceRelay>,
    pub limiter: Arc<RateLimiter>,
}

impl ApiState {
    pub fn from_config(config: &nirso_config::RelayConfig) -> Self {
        Self {
            registry: Arc::new(DeviceRegistry::new()),
            signature: Arc::new(SignatureValidator::new(
                config.security.shared_key.as_bytes(),
            )),
            relay: Arc::new(InferenceRelay::new(config.inference.url())),
            limiter: Arc::new(RateLimiter::new(
                Duration::from_secs(config.limits.rate_window_secs),
                config.limits.rate_max_requests,
            )),
        }
    }
}

/// Create the main HTTP router
pub fn create_http_server(state: ApiState) -> Router {
    use crate::endpoints::{data, devices};

    let limiter = Arc::clone(&state.limiter);

    Router::new()
        // Liveness probes
        .route("/", get(liveness))
        // Embedded client surface
        .route("/data", get(liveness).post(data::post_data))
        .route("/data/notify", post(data::post_notify))
        // Frontend polling surface
        .route("/data/get-by-did", get(devices::get_by_did))
        .route("/data/get-devices", get(devices::get_devices))
        // OpenAPI spec endpoint
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Catch-all route for unmatched requests
        .fallback(not_found)
        // Add state
        .with_state(state)
        // Add middleware (last layer added runs first)
        .layer(middleware::from_fn(log_request_bodies))
        .layer(create_cors_layer())
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(
            TraceLayer::new_for_http()
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::debug!(
                        target: "nirso-api",
                        "📥 Incoming request: {} {}",
                        request.method(),
                        request.uri()
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::debug!(
                            target: "nirso-api",
                            "📤 Response: status={}, latency={:?}",
                            response.status(),
                            latency
                        );
                    },
                ),
        )
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 404 handler with the legacy content negotiation: a JSON body for JSON
/// clients, plain text for everyone else.
async fn not_found(headers: HeaderMap) -> Response {
    tracing::warn!(target: "nirso-api", "⚠️ Unmatched request - 404 Not Found");
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept == "application/json")
        .unwrap_or(false);
    if accepts_json {
        (StatusCode::NOT_FOUND, Json(MsgResponse::new("not found"))).into_response()
    } else {
        (StatusCode::NOT_FOUND, "not found").into_response()
    }
}
