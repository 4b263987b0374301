// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! OpenAPI documentation for the relay HTTP surface.

use utoipa::OpenApi;

use crate::common::response::{DeviceListing, DeviceStatus};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nirso Relay API",
        description = "Device-session relay between NIR spectral sensors and the inference backend"
    ),
    paths(
        crate::endpoints::data::post_data,
        crate::endpoints::data::post_notify,
        crate::endpoints::devices::get_by_did,
        crate::endpoints::devices::get_devices,
    ),
    components(schemas(DeviceStatus, DeviceListing)),
    tags(
        (name = "data", description = "Embedded client submission endpoints"),
        (name = "devices", description = "Frontend polling endpoints")
    )
)]
pub struct ApiDoc;
