// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-window request rate limiting, per client address.
//!
//! 30 requests per 2-minute window per IP by default, plain-text 429 beyond
//! that. Window parameters come from `[limits]` in the relay configuration.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

struct Window {
    started: Instant,
    requests: u32,
}

pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `client`; false once the window is exhausted.
    pub fn try_acquire(&self, client: IpAddr) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock();
        let window = clients.entry(client).or_insert(Window {
            started: now,
            requests: 0,
        });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.requests = 0;
        }
        window.requests += 1;
        window.requests <= self.max_requests
    }
}

/// Requests without connection info (e.g. in-process test harnesses) share
/// one unspecified-address bucket.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    addr: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = addr
        .map(|ConnectInfo(a)| a.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !limiter.try_acquire(client) {
        tracing::warn!("rate limit exceeded for {client}");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        )
            .into_response();
    }

    next.run(request).await
}
