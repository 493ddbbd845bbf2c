use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use std::sync::Arc;

use crate::{auth, inventory, transfer_orders};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/auth/login", get(auth::login_url).post(auth::login_custom))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/token", post(auth::exchange))
        .route("/auth/status", get(auth::status))
        .route("/auth/logout", post(auth::logout))
        .route("/api/items", get(inventory::items))
        .route("/api/locations", get(inventory::locations))
        .route("/api/transfer-orders", post(transfer_orders::create))
        .route("/api/transfer-orders/{id}/pdf", get(transfer_orders::pdf))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(ServerState { engine })).await
}
