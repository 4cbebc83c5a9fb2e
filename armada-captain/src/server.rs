use crate::handlers;
use armada_core::CaptainConfig;
use armada_store::Catalog;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tracing::info;

/// Shared state for the captain API.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
}

/// Build the axum router with all captain routes.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Users
        .route("/users", post(handlers::users::create_user))
        .route("/users", get(handlers::users::list_users))
        .route("/users/proxy-string", post(handlers::users::generate_proxy_string))
        .route("/users/{id}", get(handlers::users::get_user))
        .route("/users/{id}", put(handlers::users::update_user))
        .route("/users/{id}", delete(handlers::users::delete_user))
        // Pools
        .route("/pools", post(handlers::pools::create_pool))
        .route("/pools", get(handlers::pools::list_pools))
        .route("/pools/{name}", get(handlers::pools::get_pool))
        .route("/pools/{name}", put(handlers::pools::update_pool))
        .route("/pools/{name}", delete(handlers::pools::delete_pool))
        // Informational catalog
        .route("/workers", post(handlers::catalog::create_worker))
        .route("/workers", get(handlers::catalog::list_workers))
        .route("/workers/{name}", delete(handlers::catalog::delete_worker))
        .route("/regions", post(handlers::catalog::create_region))
        .route("/regions", get(handlers::catalog::list_regions))
        .route("/regions/{name}", delete(handlers::catalog::delete_region))
        .route("/countries", post(handlers::catalog::create_country))
        .route("/countries", get(handlers::catalog::list_countries))
        .route("/countries/{code}", delete(handlers::catalog::delete_country))
        // Worker-facing endpoints
        .route("/config", get(handlers::fleet::get_config))
        .route("/auth", post(handlers::fleet::authenticate))
        .route("/usage", post(handlers::fleet::report_usage));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::fleet::health))
        .with_state(state)
}

/// Start the captain API server.
pub async fn serve(config: CaptainConfig, state: AppState) -> anyhow::Result<()> {
    let addr = config.listen_addr;
    let app = build_router(state);

    info!(addr = %addr, "Starting captain API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
