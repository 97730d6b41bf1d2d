//! # HTTP Error Mapping
//!
//! Maps the bridge error taxonomy onto HTTP responses:
//! - `Validation` -> 400 `{"error": ...}`
//! - everything else -> 500 `{"success": false, "error": ..., "errorCode": ...}`
//!
//! Outside production the 500 body also carries a `detail` field with the
//! debug rendering of the failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::errors::BridgeError;

/// A bridge error ready to serialize as an HTTP response
#[derive(Debug)]
pub struct ApiError {
    error: BridgeError,
    detail: Option<String>,
}

impl ApiError {
    /// Wrap an error; `verbose` controls whether debug detail is exposed
    pub fn new(error: BridgeError, verbose: bool) -> Self {
        let detail = verbose.then(|| format!("{:?}", error));
        Self { error, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();

        if status == StatusCode::BAD_REQUEST {
            let body = json!({ "error": self.error.to_string() });
            return (status, Json(body)).into_response();
        }

        let mut body = json!({
            "success": false,
            "error": self.error.to_string(),
            "errorCode": self.error.error_code(),
        });
        if let Some(detail) = self.detail {
            body["detail"] = Value::String(detail);
        }
        (status, Json(body)).into_response()
    }
}
