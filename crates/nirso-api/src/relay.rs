// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Streaming proxy to the external inference endpoint.
//!
//! The upstream body fans out through a broadcast channel to two independent
//! consumers: one feeds the caller's streamed response, the other accumulates
//! the body and best-effort updates the owning device session once the
//! stream ends. The caller-facing response is cut off 5 seconds after the
//! request starts; the upstream request itself is fire-and-forget once
//! dispatched.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

use crate::common::ApiError;
use crate::device::DeviceSession;

/// Caller-facing deadline, measured from request start.
const RESPONSE_DEADLINE: Duration = Duration::from_secs(5);

/// Broadcast depth of the upstream chunk fan-out.
const FANOUT_CAPACITY: usize = 32;

pub struct InferenceRelay {
    client: reqwest::Client,
    endpoint: String,
}

impl InferenceRelay {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `{"inputs": [normalized]}` upstream and stream the response body
    /// back to the caller. `session` receives the parsed prediction and the
    /// submission timestamp once the upstream stream completes.
    ///
    /// Connection failure is a single-attempt 500; re-submission is the
    /// client's responsibility.
    pub async fn forward(
        &self,
        normalized: Vec<f64>,
        caller_ip: Option<IpAddr>,
        session: Arc<DeviceSession>,
        submitted_at: u64,
    ) -> Result<Response, ApiError> {
        let started = Instant::now();
        // NaN and Infinity have no JSON representation and serialize as
        // null, which the serving backend already tolerates.
        let payload = serde_json::json!({ "inputs": [normalized] });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(ip) = caller_ip {
            request = request.header("x-forwarded-for", ip.to_string());
        }

        let upstream = match tokio::time::timeout(RESPONSE_DEADLINE, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!("error on inference endpoint: {err}");
                return Err(ApiError::upstream(err.to_string()));
            }
            Err(_) => {
                warn!("client response timed out, closing stream");
                return Ok((StatusCode::OK, Body::empty()).into_response());
            }
        };
        debug!("inference endpoint status: {}", upstream.status());
        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let (fanout_tx, _) = broadcast::channel::<Bytes>(FANOUT_CAPACITY);
        let caller_rx = fanout_tx.subscribe();
        let collector_rx = fanout_tx.subscribe();

        // Pump upstream chunks into the fan-out; dropping the sender at the
        // end is what closes both consumers.
        tokio::spawn(async move {
            let mut stream = upstream.bytes_stream();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        if fanout_tx.send(bytes).is_err() {
                            break; // all consumers gone
                        }
                    }
                    Err(err) => {
                        warn!("upstream body stream error: {err}");
                        break;
                    }
                }
            }
        });

        tokio::spawn(collect_and_update(collector_rx, session, submitted_at));

        let body_rx = spawn_caller_stream(caller_rx, started + RESPONSE_DEADLINE);

        let mut response = Response::builder().status(StatusCode::OK);
        if let Some(content_type) = content_type {
            response = response.header(header::CONTENT_TYPE, content_type);
        }
        response
            .body(Body::from_stream(ReceiverStream::new(body_rx)))
            .map_err(|err| ApiError::internal(err.to_string()))
    }
}

/// Forward fan-out chunks into the caller's body until the stream closes or
/// the deadline fires. The timer dies with the task on normal completion.
fn spawn_caller_stream(
    mut caller_rx: broadcast::Receiver<Bytes>,
    deadline: Instant,
) -> mpsc::Receiver<Result<Bytes, std::io::Error>> {
    let (body_tx, body_rx) = mpsc::channel(FANOUT_CAPACITY);
    tokio::spawn(async move {
        let timeout = tokio::time::sleep_until(deadline);
        tokio::pin!(timeout);
        loop {
            tokio::select! {
                _ = &mut timeout => {
                    warn!("client response timed out, closing stream");
                    break;
                }
                received = caller_rx.recv() => match received {
                    Ok(bytes) => {
                        if body_tx.send(Ok(bytes)).await.is_err() {
                            break; // caller hung up
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("caller stream lagged, {skipped} chunks dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
    body_rx
}

/// Accumulate the upstream body and update the session when it completes.
/// Decode failures are logged and discarded - the caller's response path
/// never depends on this consumer.
async fn collect_and_update(
    mut collector_rx: broadcast::Receiver<Bytes>,
    session: Arc<DeviceSession>,
    submitted_at: u64,
) {
    let mut collected: Vec<u8> = Vec::new();
    loop {
        match collector_rx.recv().await {
            Ok(bytes) => collected.extend_from_slice(&bytes),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("prediction collector lagged, {skipped} chunks dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    if collected.is_empty() {
        return;
    }

    let body = String::from_utf8_lossy(&collected);
    if let Err(err) = session.record_prediction(&body) {
        debug!("failed to decode label for device {}: {err}", session.id());
    }
    session.touch(submitted_at);
}
