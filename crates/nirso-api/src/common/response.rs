use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Legacy wire envelope: every JSON response body is `{"msg": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgResponse<T> {
    pub msg: T,
}

impl<T> MsgResponse<T> {
    pub fn new(msg: T) -> Self {
        Self { msg }
    }
}

/// Per-device status line for the polling frontend
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceStatus {
    /// Ranked prediction summary, `"0"` before the first measurement
    pub label: String,
    /// Formatted last-update time, `"0"` before the first measurement
    pub time: String,
}

impl DeviceStatus {
    /// Placeholder payload returned for unknown or not-yet-reported devices,
    /// so polling frontends keep rendering instead of handling errors.
    pub fn placeholder() -> Self {
        Self {
            label: "0".to_string(),
            time: "0".to_string(),
        }
    }
}

/// Registry summary for the device-listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceListing {
    pub count: usize,
    /// Device ids in creation order, not numeric order
    pub ids: Vec<u8>,
}
