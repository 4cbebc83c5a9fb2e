use super::error_response;
use crate::server::AppState;
use armada_core::user::{AuthRequest, AuthResponse, UsageReport, UserStatus};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};
use tracing::debug;

// Worker-facing endpoints: pool-catalog sync, credential checks, and
// usage accounting for the data plane.

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Full pool map, replacing the worker's snapshot wholesale.
pub async fn get_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.catalog.all_pools()))
}

/// Check a username/password pair.
///
/// Failures are a 200 with `success=false` — the data plane must be able
/// to tell "captain unreachable" from "credentials rejected", so rejection
/// is never an HTTP error.
pub async fn authenticate(
    State(state): State<AppState>,
    Json(req): Json<AuthRequest>,
) -> Json<AuthResponse> {
    let user = match state.catalog.get_user_by_username(&req.username) {
        Ok(user) => user,
        Err(_) => {
            debug!(username = %req.username, "Auth: unknown user");
            return Json(AuthResponse::denied("Invalid credentials"));
        }
    };

    // bcrypt::verify performs the constant-time hash comparison.
    if !bcrypt::verify(&req.password, &user.password_hash).unwrap_or(false) {
        debug!(username = %req.username, "Auth: bad password");
        return Json(AuthResponse::denied("Invalid credentials"));
    }

    if user.status != UserStatus::Active {
        return Json(AuthResponse::denied("User account is suspended"));
    }

    Json(AuthResponse::granted(&user))
}

/// Additive usage delta. Commutative, so reports may arrive in any order.
pub async fn report_usage(
    State(state): State<AppState>,
    Json(req): Json<UsageReport>,
) -> (StatusCode, Json<Value>) {
    let result = state.catalog.update_user(&req.user_id, |user| {
        user.data_used += req.bytes;
        Ok(())
    });

    match result {
        Ok(user) => {
            debug!(user_id = %req.user_id, bytes = req.bytes, total = user.data_used, "Usage reported");
            (StatusCode::OK, Json(json!({ "message": "Usage reported" })))
        }
        Err(e) => error_response(&e),
    }
}
