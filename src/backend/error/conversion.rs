/**
 * Error Conversion
 *
 * This module provides conversion implementations for backend errors,
 * allowing them to be converted to HTTP responses and to relay frames.
 *
 * # Response Format
 *
 * Error responses are returned as JSON with the following structure:
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 401
 * }
 * ```
 */

use axum::{
    response::{Response, IntoResponse},
    http::StatusCode,
    body::Body,
};
use crate::backend::error::types::BackendError;
use crate::shared::protocol::ServerMessage;

impl IntoResponse for BackendError {
    /// Convert a backend error into an HTTP response
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        let fallback = format!(r#"{{"error":"{}","status":{}}}"#, message, status.as_u16());
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap_or(fallback)))
            .unwrap_or_else(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response())
    }
}

impl From<&BackendError> for ServerMessage {
    /// `ERROR` frame reporting the failure to the client that caused it
    fn from(error: &BackendError) -> Self {
        ServerMessage::error(error.message())
    }
}
