use super::error_response;
use crate::server::AppState;
use armada_core::fleet::{Country, Region, WorkerNode};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};

// Informational catalog entities: grouping data for operators, never
// consulted on the data path.

pub async fn create_worker(
    State(state): State<AppState>,
    Json(worker): Json<WorkerNode>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.create_worker(worker) {
        Ok(worker) => (StatusCode::CREATED, Json(json!(worker))),
        Err(e) => error_response(&e),
    }
}

pub async fn list_workers(State(state): State<AppState>) -> Json<Value> {
    let workers = state.catalog.list_workers();
    Json(json!({ "list": workers, "total": workers.len() }))
}

pub async fn delete_worker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.delete_worker(&name) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Worker deleted" }))),
        Err(e) => error_response(&e),
    }
}

pub async fn create_region(
    State(state): State<AppState>,
    Json(region): Json<Region>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.create_region(region) {
        Ok(region) => (StatusCode::CREATED, Json(json!(region))),
        Err(e) => error_response(&e),
    }
}

pub async fn list_regions(State(state): State<AppState>) -> Json<Value> {
    let regions = state.catalog.list_regions();
    Json(json!({ "list": regions, "total": regions.len() }))
}

pub async fn delete_region(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.delete_region(&name) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Region deleted" }))),
        Err(e) => error_response(&e),
    }
}

pub async fn create_country(
    State(state): State<AppState>,
    Json(country): Json<Country>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.create_country(country) {
        Ok(country) => (StatusCode::CREATED, Json(json!(country))),
        Err(e) => error_response(&e),
    }
}

pub async fn list_countries(State(state): State<AppState>) -> Json<Value> {
    let countries = state.catalog.list_countries();
    Json(json!({ "list": countries, "total": countries.len() }))
}

pub async fn delete_country(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.catalog.delete_country(&code) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Country deleted" }))),
        Err(e) => error_response(&e),
    }
}
