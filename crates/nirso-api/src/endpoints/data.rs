// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Embedded-client endpoints - measurement submission and session bootstrap.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};

use crate::common::{ApiError, ApiResult, MsgResponse};
use crate::device::ReferenceKind;
use crate::server::ApiState;
use crate::validation::{self, SubmissionKind};

/// POST /data
///
/// Validated sensor submission from an enrolled device: calibration updates
/// respond directly, measurements are normalized and relayed to the
/// inference endpoint with the response streamed back.
#[utoipa::path(
    post,
    path = "/data",
    responses(
        (status = 200, description = "Reference updated, or streamed inference response"),
        (status = 400, description = "Payload validation failed"),
        (status = 500, description = "Unknown device or inference endpoint failure")
    ),
    tag = "data"
)]
pub async fn post_data(
    State(state): State<ApiState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let submission = validation::validate_submission(&headers, &body)?;

    // Absent devices (and id 0, which passes the single-digit body check but
    // not the registry range) surface as a generic server error: enrolled
    // clients never submit before a notify.
    let session = state
        .registry
        .get(submission.id)
        .map_err(|err| ApiError::internal(err.to_string()))?
        .ok_or_else(|| ApiError::internal("Device ID does not exist in mapped devices."))?;

    match submission.kind {
        SubmissionKind::WhiteReference => {
            session.set_reference(ReferenceKind::White, submission.data);
            Ok(Json(MsgResponse::new("White reference updated.")).into_response())
        }
        SubmissionKind::DarkReference => {
            session.set_reference(ReferenceKind::Dark, submission.data);
            Ok(Json(MsgResponse::new("Dark reference updated.")).into_response())
        }
        SubmissionKind::Measurement => {
            let scaled = session.normalize(&submission.data);
            state
                .relay
                .forward(
                    scaled,
                    addr.map(|ConnectInfo(a)| a.ip()),
                    session,
                    submission.time,
                )
                .await
        }
    }
}

/// POST /data/notify
///
/// Session bootstrap: the device proves possession of the shared key by
/// signing the request timestamp. Creation is idempotent - notifying an
/// existing id returns the same session unchanged.
#[utoipa::path(
    post,
    path = "/data/notify",
    responses(
        (status = 200, description = "Device session created or already present"),
        (status = 400, description = "Validation or signature failure")
    ),
    tag = "data"
)]
pub async fn post_notify(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let notify = validation::validate_notify(&headers, &body)?;

    if !state
        .signature
        .verify(&notify.signature_hex, &notify.time.to_string())
    {
        tracing::info!("Provided client key was incorrect.");
        return Err(ApiError::Auth);
    }

    state.registry.get_or_create(notify.id).map_err(|_| {
        tracing::info!("Provided client device id was incorrect.");
        ApiError::InvalidDeviceId
    })?;

    Ok(Json(MsgResponse::new("Device succesfully initated")).into_response())
}
