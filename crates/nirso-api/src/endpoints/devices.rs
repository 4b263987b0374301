//! Frontend read endpoints - poll-friendly, never surface errors for
//! missing data.

use std::collections::HashMap;

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::Json;

use crate::common::{ApiResult, DeviceListing, DeviceStatus, MsgResponse};
use crate::device::DeviceId;
use crate::server::ApiState;
use crate::validation;

/// GET /data/get-by-did
///
/// Status line for one device. Unknown, out-of-range and not-yet-reported
/// devices all yield the placeholder payload so polling frontends keep
/// rendering.
#[utoipa::path(
    get,
    path = "/data/get-by-did",
    params(("did" = i64, Query, description = "Device identifier")),
    responses(
        (status = 200, description = "Device status, or the placeholder for unknown devices"),
        (status = 400, description = "Malformed query")
    ),
    tag = "devices"
)]
pub async fn get_by_did(
    State(state): State<ApiState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Json<MsgResponse<DeviceStatus>>> {
    let params = parse_query(query.as_deref().unwrap_or(""));
    let did = validation::validate_did_query(&headers, &params)?;

    let session = DeviceId::try_from(did)
        .ok()
        .and_then(|id| state.registry.get(id).ok().flatten());

    let status = match session {
        Some(session) => DeviceStatus {
            label: session.predicted_label(),
            time: session.last_update_display(),
        },
        None => {
            tracing::debug!("no mapped device for did {did}, returning placeholder");
            DeviceStatus::placeholder()
        }
    };

    Ok(Json(MsgResponse::new(status)))
}

/// GET /data/get-devices
///
/// Count and creation-ordered ids of every registered device.
#[utoipa::path(
    get,
    path = "/data/get-devices",
    responses((status = 200, description = "Registered device count and ids")),
    tag = "devices"
)]
pub async fn get_devices(State(state): State<ApiState>) -> Json<MsgResponse<DeviceListing>> {
    Json(MsgResponse::new(DeviceListing {
        count: state.registry.count(),
        ids: state.registry.ids(),
    }))
}

/// Duplicate keys collapse last-writer-wins; values are used verbatim (the
/// only accepted parameter holds a plain integer).
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
