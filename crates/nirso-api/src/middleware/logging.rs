// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Request logging middleware

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::BodyExt;

/// Middleware to log request bodies for debugging
///
/// Only request bodies are collected; response bodies are left untouched so
/// the streamed inference relay is never buffered here.
pub async fn log_request_bodies(request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    // Only log bodies for POST/PUT/PATCH requests
    let should_log = matches!(parts.method.as_str(), "POST" | "PUT" | "PATCH");

    let body_bytes = if should_log {
        match body.collect().await {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                if let Ok(body_str) = std::str::from_utf8(&bytes) {
                    if !body_str.is_empty() {
                        tracing::debug!(target: "nirso-api", "📥 Request body: {}", body_str);
                    }
                }
                bytes
            }
            Err(_) => {
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    } else {
        axum::body::Bytes::new()
    };

    // Reconstruct request with original body
    let request = Request::from_parts(parts, Body::from(body_bytes));

    Ok(next.run(request).await)
}
