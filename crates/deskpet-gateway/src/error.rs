//! §7 error-to-response mapping: every handler error ends up as
//! `{"success": false, "error": <friendly message>, "code": <machine code>}`
//! with the status [`deskpet_orchestrator::translate_error`] assigns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use deskpet_core::error::PetError;
use serde_json::json;

pub struct ApiError(pub PetError);

impl From<PetError> for ApiError {
    fn from(e: PetError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = deskpet_orchestrator::translate_error(&self.0);
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "success": false, "error": message, "code": self.0.code() }))).into_response()
    }
}
