use super::error_response;
use crate::server::AppState;
use armada_core::filter::render_filter;
use armada_core::user::{CreateUserRequest, GenerateRequest, UpdateUserRequest, UserStatus};
use armada_core::{ArmadaError, User};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> (StatusCode, Json<Value>) {
    let password_hash = match bcrypt::hash(&req.password, bcrypt::DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        password_hash,
        data_limit: req.data_limit,
        data_used: 0,
        allowed_pools: req.allowed_pools,
        ip_whitelist: req.ip_whitelist,
        status: UserStatus::Active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    match state.catalog.create_user(user) {
        Ok(user) => (StatusCode::CREATED, Json(json!(user))),
        Err(e) => error_response(&e),
    }
}

pub async fn list_users(State(state): State<AppState>) -> Json<Value> {
    let users = state.catalog.list_users();
    Json(json!({ "list": users, "total": users.len() }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.get_user(&id) {
        Ok(user) => (StatusCode::OK, Json(json!(user))),
        Err(e) => error_response(&e),
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> (StatusCode, Json<Value>) {
    // Hash outside the catalog lock.
    let password_hash = match req.password {
        Some(ref password) => match bcrypt::hash(password, bcrypt::DEFAULT_COST) {
            Ok(h) => Some(h),
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                );
            }
        },
        None => None,
    };

    let result = state.catalog.update_user(&id, |user| {
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        if let Some(data_limit) = req.data_limit {
            if data_limit < 0 {
                return Err(ArmadaError::BadRequest("data_limit must be >= 0".into()));
            }
            user.data_limit = data_limit;
        }
        if let Some(allowed_pools) = req.allowed_pools {
            user.allowed_pools = allowed_pools;
        }
        if let Some(ip_whitelist) = req.ip_whitelist {
            user.ip_whitelist = ip_whitelist;
        }
        if let Some(status) = req.status {
            user.status = status;
        }
        Ok(())
    });

    match result {
        Ok(user) => (StatusCode::OK, Json(json!(user))),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.delete_user(&id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "User deleted" }))),
        Err(e) => error_response(&e),
    }
}

/// Render the vendor filter suffix a client embeds after its password.
pub async fn generate_proxy_string(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.get_user(&req.user_id) {
        Ok(user) => {
            let filter = render_filter(
                &req.upstream,
                &req.country,
                req.is_sticky,
                &mut rand::thread_rng(),
            );
            (
                StatusCode::OK,
                Json(json!({ "user_id": user.id, "filter": filter })),
            )
        }
        Err(e) => error_response(&e),
    }
}
