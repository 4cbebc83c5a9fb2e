use super::error_response;
use crate::server::AppState;
use armada_core::Pool;
use armada_core::pool::{CreatePoolRequest, UpdatePoolRequest};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};

pub async fn create_pool(
    State(state): State<AppState>,
    Json(req): Json<CreatePoolRequest>,
) -> (StatusCode, Json<Value>) {
    let pool = Pool {
        name: req.name,
        region: req.region,
        subdomain: req.subdomain,
        port_start: req.port_start,
        port_end: req.port_end,
        outs: req.outs,
    };

    match state.catalog.create_pool(pool) {
        Ok(pool) => (StatusCode::CREATED, Json(json!(pool))),
        Err(e) => error_response(&e),
    }
}

pub async fn list_pools(State(state): State<AppState>) -> Json<Value> {
    let pools = state.catalog.list_pools();
    Json(json!({ "list": pools, "total": pools.len() }))
}

pub async fn get_pool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.get_pool(&name) {
        Ok(pool) => (StatusCode::OK, Json(json!(pool))),
        Err(e) => error_response(&e),
    }
}

pub async fn update_pool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<UpdatePoolRequest>,
) -> (StatusCode, Json<Value>) {
    let result = state.catalog.update_pool(&name, |pool| {
        if let Some(region) = req.region {
            pool.region = region;
        }
        if let Some(subdomain) = req.subdomain {
            pool.subdomain = subdomain;
        }
        if let Some(port_start) = req.port_start {
            pool.port_start = port_start;
        }
        if let Some(port_end) = req.port_end {
            pool.port_end = port_end;
        }
        if let Some(outs) = req.outs {
            pool.outs = outs;
        }
        Ok(())
    });

    match result {
        Ok(pool) => (StatusCode::OK, Json(json!(pool))),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_pool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.delete_pool(&name) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Pool deleted" }))),
        Err(e) => error_response(&e),
    }
}
