// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Request payload validation.
//!
//! Each route runs a strict ordered chain of independent predicates; the
//! first failing predicate determines the wire error message. The chain
//! ordering and the message texts are a frozen client contract - container
//! keys are checked before any individual field, even when a present field
//! is malformed.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use serde_json::Value;

use crate::common::ApiError;

/// Spectral vector length produced by the sensor head.
pub const SPECTRUM_LEN: usize = 512;

/// Closed set of submission tags carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    WhiteReference,
    DarkReference,
    Measurement,
}

impl SubmissionKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "w" => Some(Self::WhiteReference),
            "b" => Some(Self::DarkReference),
            "m" => Some(Self::Measurement),
            _ => None,
        }
    }
}

/// A fully validated measurement submission (POST `/data`).
#[derive(Debug, Clone)]
pub struct MeasurementSubmission {
    pub data: Vec<f64>,
    pub time: u64,
    pub id: u8,
    pub kind: SubmissionKind,
}

/// A fully validated session bootstrap request (POST `/data/notify`).
#[derive(Debug, Clone)]
pub struct NotifyRequest {
    pub time: u64,
    pub id: u8,
    pub signature_hex: String,
}

fn check_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type != Some("application/json") {
        tracing::debug!("missing or mismatched content-type header");
        return Err(ApiError::validation("Invalid Content-Type header"));
    }
    Ok(())
}

fn parse_json_body(body: &[u8]) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        tracing::debug!("invalid json in request body: {err}");
        ApiError::validation("invalid json")
    })
}

/// `time` must be an integer whose decimal representation has exactly 10
/// digits - a plausible UNIX-seconds value.
fn check_timestamp(value: &Value) -> Result<u64, ApiError> {
    value
        .as_u64()
        .filter(|t| (1_000_000_000..=9_999_999_999).contains(t))
        .ok_or_else(|| ApiError::validation("Invalid timestamp"))
}

/// `id` must be a number (`Invalid ID type`) whose decimal representation is
/// a single digit (`Invalid ID length`). Registry range membership is checked
/// later: 0 passes here and is rejected there.
fn check_device_id(value: &Value) -> Result<u8, ApiError> {
    if !value.is_number() {
        return Err(ApiError::validation("Invalid ID type"));
    }
    value
        .as_u64()
        .filter(|id| *id <= 9)
        .map(|id| id as u8)
        .ok_or_else(|| ApiError::validation("Invalid ID length"))
}

/// Validate a POST `/data` submission.
pub fn validate_submission(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<MeasurementSubmission, ApiError> {
    check_content_type(headers)?;
    let payload = parse_json_body(body)?;

    let has = |key: &str| payload.get(key).is_some();
    if !(has("data") && has("time") && has("id") && has("type")) {
        return Err(ApiError::validation("Missing request body content"));
    }

    let data = match payload["data"].as_array() {
        Some(elements) if elements.len() == SPECTRUM_LEN => elements,
        _ => return Err(ApiError::validation("Invalid request data content")),
    };
    if !data.iter().all(Value::is_number) {
        return Err(ApiError::validation("Invalid data elements"));
    }
    let data: Vec<f64> = data
        .iter()
        .map(|v| v.as_f64().unwrap_or(f64::NAN))
        .collect();

    let time = check_timestamp(&payload["time"])?;
    let id = check_device_id(&payload["id"])?;

    let tag = match payload["type"].as_str() {
        Some(tag) if tag.chars().count() == 1 => tag,
        _ => return Err(ApiError::validation("Invalid request type field")),
    };
    let kind = SubmissionKind::from_tag(tag)
        .ok_or_else(|| ApiError::validation("Unknown submission type"))?;

    Ok(MeasurementSubmission {
        data,
        time,
        id,
        kind,
    })
}

fn is_lower_hex(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Validate a POST `/data/notify` request.
pub fn validate_notify(headers: &HeaderMap, body: &[u8]) -> Result<NotifyRequest, ApiError> {
    check_content_type(headers)?;

    let signature_hex = headers
        .get("x-hmac-sig")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::validation("Missing HMAC header"))?;
    if signature_hex.len() != 64 || !is_lower_hex(signature_hex) {
        tracing::debug!("malformed X-Hmac-Sig header");
        return Err(ApiError::validation("Invalid X-Hmac-Sig header"));
    }
    let signature_hex = signature_hex.to_string();

    let payload = parse_json_body(body)?;
    if payload.get("time").is_none() || payload.get("id").is_none() {
        return Err(ApiError::validation("Missing request body content"));
    }
    let time = check_timestamp(&payload["time"])?;
    let id = check_device_id(&payload["id"])?;

    Ok(NotifyRequest {
        time,
        id,
        signature_hex,
    })
}

/// Validate the GET `/data/get-by-did` query: exactly one parameter, named
/// `did`, holding an integer. Returns the parsed DID.
pub fn validate_did_query(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Result<i64, ApiError> {
    check_content_type(headers)?;
    if query.len() != 1 || !query.contains_key("did") {
        return Err(ApiError::validation("Invalid request body"));
    }
    query["did"]
        .parse::<i64>()
        .map_err(|_| ApiError::validation("Invalid request DID"))
}
