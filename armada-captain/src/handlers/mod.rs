pub mod catalog;
pub mod fleet;
pub mod pools;
pub mod users;

use armada_core::ArmadaError;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};

/// Map a catalog error to its HTTP response.
pub(crate) fn error_response(err: &ArmadaError) -> (StatusCode, Json<Value>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.to_string() })))
}
