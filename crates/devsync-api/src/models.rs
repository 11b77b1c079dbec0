// ── Wire-level device payloads ──
//
// Device state is kept as an untyped JSON object at this layer; the
// per-vendor field layout is interpreted by devsync-core's channel catalog.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw device state: the top-level JSON object returned by a state fetch.
pub type DeviceState = Map<String, Value>;

/// `@type` discriminator of the vendor error envelope.
pub const REST_EXCEPTION_TYPE: &str = "JsonRestExceptionResponseEntity";

/// Generic error response some device REST APIs return instead of data.
///
/// ```json
/// { "@type": "JsonRestExceptionResponseEntity", "errorCode": "...", "statusCode": 401 }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestExceptionResponse {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub status_code: u16,
}

impl RestExceptionResponse {
    /// Parse `body` as an error envelope. Returns `None` for anything else,
    /// including valid JSON with a different `@type`.
    pub fn parse(body: &str) -> Option<Self> {
        let envelope: Self = serde_json::from_str(body).ok()?;
        (envelope.kind == REST_EXCEPTION_TYPE).then_some(envelope)
    }
}
