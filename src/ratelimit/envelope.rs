//! JSON error body returned to API clients.

use serde::{Deserialize, Serialize};

/// `{"status": "failed", "status_code": ..., "target": ..., "action": ..., "exception_cls": ..., "exception_msg": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub status_code: u16,
    /// Request path.
    pub target: String,
    /// Upper-cased HTTP method.
    pub action: String,
    pub exception_cls: String,
    pub exception_msg: String,
}

impl ErrorEnvelope {
    pub fn failed(
        status_code: u16,
        target: impl Into<String>,
        action: &str,
        exception_cls: impl Into<String>,
        exception_msg: impl Into<String>,
    ) -> Self {
        Self {
            status: "failed".to_string(),
            status_code,
            target: target.into(),
            action: action.to_uppercase(),
            exception_cls: exception_cls.into(),
            exception_msg: exception_msg.into(),
        }
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for ErrorEnvelope {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code)
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self)).into_response()
    }
}
