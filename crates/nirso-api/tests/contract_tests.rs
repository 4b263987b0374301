// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Contract tests for the relay HTTP surface.
//!
//! Each test drives the axum router directly (tower `oneshot`) and mocks the
//! inference endpoint with wiremock where one is needed. Response bodies and
//! status codes are part of the frozen client contract.

use std::sync::Arc;
use std::time::Duration;

use assert_json_diff::assert_json_eq;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nirso_api::middleware::rate_limit::RateLimiter;
use nirso_api::{create_http_server, ApiState, DeviceRegistry, InferenceRelay, SignatureValidator};

const SHARED_KEY: &[u8] = b"test-shared-key";
const TEST_TIME: u64 = 1714258662;

/// Nothing listens on the discard port; measurement relays against this
/// state fail fast.
const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9/v1/models/fabric:predict";

fn build_state(inference_url: &str, rate_max_requests: u32) -> ApiState {
    ApiState {
        registry: Arc::new(DeviceRegistry::new()),
        signature: Arc::new(SignatureValidator::new(SHARED_KEY.to_vec())),
        relay: Arc::new(InferenceRelay::new(inference_url)),
        limiter: Arc::new(RateLimiter::new(
            Duration::from_secs(120),
            rate_max_requests,
        )),
    }
}

fn test_app() -> Router {
    create_http_server(build_state(UNREACHABLE_ENDPOINT, 1000))
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();
    (status, body)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::empty())
        .unwrap()
}

fn sign(time: u64) -> String {
    SignatureValidator::new(SHARED_KEY.to_vec()).sign(&time.to_string())
}

fn notify_request(time: u64, id: u64, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/data/notify")
        .header("content-type", "application/json")
        .header("x-hmac-sig", signature)
        .body(Body::from(
            serde_json::to_vec(&json!({"time": time, "id": id})).unwrap(),
        ))
        .unwrap()
}

fn submission(id: u64, tag: &str, value: f64) -> Value {
    json!({"data": vec![value; 512], "time": TEST_TIME, "id": id, "type": tag})
}

fn msg_of(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).expect("JSON body");
    value["msg"].as_str().expect("msg string").to_string()
}

// ---------------------------------------------------------------------------
// Liveness + fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn liveness_probes_respond_200() {
    let app = test_app();
    for uri in ["/", "/data"] {
        let (status, _) = call(
            &app,
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn fallback_negotiates_json_and_text() {
    let app = test_app();

    let (status, body) = call(
        &app,
        Request::builder()
            .method("GET")
            .uri("/nope")
            .header("accept", "application/json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(msg_of(&body), "not found");

    let (status, body) = call(
        &app,
        Request::builder()
            .method("GET")
            .uri("/nope")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"not found");
}

// ---------------------------------------------------------------------------
// Notify (session bootstrap)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notify_creates_a_session_idempotently() {
    let app = test_app();
    let signature = sign(TEST_TIME);

    for _ in 0..2 {
        let (status, body) = call(&app, notify_request(TEST_TIME, 1, &signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(msg_of(&body), "Device succesfully initated");
    }

    let (status, body) = call(&app, get_request("/data/get-devices")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_json_eq!(value, json!({"msg": {"count": 1, "ids": [1]}}));
}

#[tokio::test]
async fn notify_rejects_a_wrong_signature() {
    let app = test_app();
    // Valid shape, signed over a different timestamp.
    let signature = sign(TEST_TIME + 4);

    let (status, body) = call(&app, notify_request(TEST_TIME, 1, &signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(msg_of(&body), "Invalid client key");
}

#[tokio::test]
async fn notify_rejects_malformed_signature_headers_before_verification() {
    let app = test_app();

    for bad_signature in ["a".repeat(63), "Z".repeat(64), "g".repeat(64)] {
        let (status, body) = call(&app, notify_request(TEST_TIME, 1, &bad_signature)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg_of(&body), "Invalid X-Hmac-Sig header");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/data/notify")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({"time": TEST_TIME, "id": 1})).unwrap(),
        ))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(msg_of(&body), "Missing HMAC header");
}

#[tokio::test]
async fn notify_requires_the_json_content_type() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/data/notify")
        .header("x-hmac-sig", sign(TEST_TIME))
        .body(Body::from(
            serde_json::to_vec(&json!({"time": TEST_TIME, "id": 1})).unwrap(),
        ))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(msg_of(&body), "Invalid Content-Type header");
}

#[tokio::test]
async fn notify_rejects_id_zero_as_invalid_device_id() {
    let app = test_app();
    let (status, body) = call(&app, notify_request(TEST_TIME, 0, &sign(TEST_TIME))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(msg_of(&body), "Invalid device id");
}

#[tokio::test]
async fn malformed_json_bodies_are_rejected() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/data/notify")
        .header("content-type", "application/json")
        .header("x-hmac-sig", sign(TEST_TIME))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(msg_of(&body), "invalid json");
}

// ---------------------------------------------------------------------------
// Submission validation chain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submission_validation_reports_the_first_failing_predicate() {
    let app = test_app();

    // Container keys win over a present-but-malformed field.
    let cases: Vec<(Value, &str)> = vec![
        (json!({"data": "123.123"}), "Missing request body content"),
        (
            json!({"data": [1.0, 2.0], "time": TEST_TIME, "id": 1, "type": "w"}),
            "Invalid request data content",
        ),
        (
            json!({"data": vec![1.0; 512], "time": 123, "id": 1, "type": "w"}),
            "Invalid timestamp",
        ),
        (
            json!({"data": vec![1.0; 512], "time": TEST_TIME, "id": "1", "type": "w"}),
            "Invalid ID type",
        ),
        (
            json!({"data": vec![1.0; 512], "time": TEST_TIME, "id": 10, "type": "w"}),
            "Invalid ID length",
        ),
        (
            json!({"data": vec![1.0; 512], "time": TEST_TIME, "id": 1, "type": "ww"}),
            "Invalid request type field",
        ),
        (
            json!({"data": vec![1.0; 512], "time": TEST_TIME, "id": 1, "type": "x"}),
            "Unknown submission type",
        ),
    ];

    for (body, expected) in cases {
        let (status, response) = call(&app, json_request("POST", "/data", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{expected}");
        assert_eq!(msg_of(&response), expected);
    }
}

#[tokio::test]
async fn submissions_for_unknown_devices_are_a_server_error() {
    let app = test_app();
    let (status, body) = call(&app, json_request("POST", "/data", &submission(2, "w", 1.0))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(msg_of(&body), "Internal Server Error");
}

// ---------------------------------------------------------------------------
// Frontend read surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_by_did_substitutes_placeholders_for_unknown_devices() {
    let app = test_app();

    // Unknown, out-of-range, and not-yet-reported devices all read the same.
    for uri in ["/data/get-by-did?did=5", "/data/get-by-did?did=77"] {
        let (status, body) = call(&app, get_request(uri)).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_json_eq!(value, json!({"msg": {"label": "0", "time": "0"}}));
    }

    let (status, _) = call(&app, notify_request(TEST_TIME, 1, &sign(TEST_TIME))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, get_request("/data/get-by-did?did=1")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_json_eq!(value, json!({"msg": {"label": "0", "time": "0"}}));
}

#[tokio::test]
async fn get_by_did_validates_its_query() {
    let app = test_app();

    let cases = [
        ("/data/get-by-did", "Invalid request body"),
        ("/data/get-by-did?did=1&extra=2", "Invalid request body"),
        ("/data/get-by-did?did=abc", "Invalid request DID"),
    ];
    for (uri, expected) in cases {
        let (status, body) = call(&app, get_request(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(msg_of(&body), expected);
    }

    // Content type is checked before the query.
    let request = Request::builder()
        .method("GET")
        .uri("/data/get-by-did?did=1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(msg_of(&body), "Invalid Content-Type header");
}

#[tokio::test]
async fn get_devices_lists_ids_in_insertion_order() {
    let app = test_app();
    for id in [1u64, 3, 7] {
        let (status, _) = call(&app, notify_request(TEST_TIME, id, &sign(TEST_TIME))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app, get_request("/data/get-devices")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_json_eq!(value, json!({"msg": {"count": 3, "ids": [1, 3, 7]}}));
}

// ---------------------------------------------------------------------------
// Measurement relay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn measurement_roundtrip_streams_the_body_and_updates_the_session() {
    let mock = MockServer::start().await;
    // Calibrated with white=2, dark=0 and measuring all-1.0, the reflectance
    // is uniformly 0.5 and the constant-vector rescale degenerates to NaN,
    // which serializes as null on the wire.
    let expected_inputs = json!({"inputs": [vec![Value::Null; 512]]});
    Mock::given(method("POST"))
        .and(path("/v1/models/fabric:predict"))
        .and(body_json(&expected_inputs))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"outputs": [[0.1, 0.7, 0.2]]})),
        )
        .expect(1)
        .mount(&mock)
        .await;

    let app = create_http_server(build_state(
        &format!("{}/v1/models/fabric:predict", mock.uri()),
        1000,
    ));

    let (status, _) = call(&app, notify_request(TEST_TIME, 1, &sign(TEST_TIME))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, json_request("POST", "/data", &submission(1, "w", 2.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(msg_of(&body), "White reference updated.");

    let (status, body) = call(&app, json_request("POST", "/data", &submission(1, "b", 0.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(msg_of(&body), "Dark reference updated.");

    let (status, body) = call(&app, json_request("POST", "/data", &submission(1, "m", 1.0))).await;
    assert_eq!(status, StatusCode::OK);
    let relayed: Value = serde_json::from_slice(&body).expect("verbatim upstream body");
    assert_json_eq!(relayed, json!({"outputs": [[0.1, 0.7, 0.2]]}));

    // The session update is the second, independent consumer of the upstream
    // stream; poll until it lands.
    let mut status_line = json!(null);
    for _ in 0..50 {
        let (_, body) = call(&app, get_request("/data/get-by-did?did=1")).await;
        status_line = serde_json::from_slice(&body).unwrap();
        if status_line["msg"]["label"] != json!("0") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(
        status_line["msg"]["label"],
        json!("Cotton: 0.70\nWool: 0.20\nPolyester: 0.10")
    );
    assert_ne!(status_line["msg"]["time"], json!("0"));
}

#[tokio::test]
async fn unreachable_inference_endpoint_is_a_server_error() {
    let app = test_app();

    let (status, _) = call(&app, notify_request(TEST_TIME, 1, &sign(TEST_TIME))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, json_request("POST", "/data", &submission(1, "m", 1.0))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(msg_of(&body), "Internal Server Error");
}

#[tokio::test]
async fn slow_upstream_is_cut_off_at_the_deadline() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/fabric:predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"outputs": [[1.0, 0.0, 0.0]]}))
                .set_delay(Duration::from_secs(7)),
        )
        .mount(&mock)
        .await;

    let app = create_http_server(build_state(
        &format!("{}/v1/models/fabric:predict", mock.uri()),
        1000,
    ));
    let (status, _) = call(&app, notify_request(TEST_TIME, 1, &sign(TEST_TIME))).await;
    assert_eq!(status, StatusCode::OK);

    let started = std::time::Instant::now();
    let (status, body) = call(&app, json_request("POST", "/data", &submission(1, "m", 1.0))).await;
    let elapsed = started.elapsed();

    // The caller gets an empty 200 at the 5s mark instead of hanging.
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(elapsed >= Duration::from_millis(4500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(6500), "{elapsed:?}");
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn requests_beyond_the_window_limit_get_429() {
    let app = create_http_server(build_state(UNREACHABLE_ENDPOINT, 3));

    for _ in 0..3 {
        let (status, _) = call(
            &app,
            Request::builder()
                .method("GET")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(
        &app,
        Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, b"Too many requests, please try again later.");
}

// ---------------------------------------------------------------------------
// OpenAPI surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn openapi_document_lists_the_relay_paths() {
    let app = test_app();
    let (status, body) = call(
        &app,
        Request::builder()
            .method("GET")
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let document: Value = serde_json::from_slice(&body).unwrap();
    for route in ["/data", "/data/notify", "/data/get-by-did", "/data/get-devices"] {
        assert!(
            document["paths"].get(route).is_some(),
            "missing path {route}"
        );
    }
}
