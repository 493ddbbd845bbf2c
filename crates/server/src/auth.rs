//! OAuth login flow endpoints

use api_types::auth::{AuthStatus, CallbackQuery, CodeExchange, LoginRequest, LoginUrl, Success};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{ServerError, server::ServerState};

fn redirect(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Authorize URL for the configured scope.
pub async fn login_url(State(state): State<ServerState>) -> Json<LoginUrl> {
    Json(LoginUrl {
        auth_url: state.engine.login_url(None),
    })
}

/// Authorize URL for `customScope`, falling back to the configured scope
/// when the body is missing or has none.
pub async fn login_custom(State(state): State<ServerState>, body: Bytes) -> Json<LoginUrl> {
    let request: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();
    Json(LoginUrl {
        auth_url: state.engine.login_url(request.custom_scope.as_deref()),
    })
}

/// OAuth redirect target.
pub async fn callback(
    State(state): State<ServerState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        tracing::warn!("oauth callback without code");
        return redirect("/?auth=error");
    };

    match state.engine.tokens().exchange_code(&code).await {
        Ok(_) => redirect("/?auth=success"),
        Err(err) => {
            tracing::error!("oauth callback failed: {err}");
            redirect("/?auth=error")
        }
    }
}

/// Manual code exchange.
pub async fn exchange(
    State(state): State<ServerState>,
    payload: Result<Json<CodeExchange>, JsonRejection>,
) -> Result<Json<Success>, ServerError> {
    let Json(payload) = payload?;
    state
        .engine
        .tokens()
        .exchange_code(&payload.code)
        .await
        .map_err(ServerError::failed("Failed to exchange code for token"))?;

    Ok(Json(Success {
        success: true,
        message: "Token obtained successfully".to_string(),
    }))
}

pub async fn status(State(state): State<ServerState>) -> Json<AuthStatus> {
    Json(state.engine.tokens().status().await)
}

pub async fn logout(State(state): State<ServerState>) -> Json<Success> {
    state.engine.tokens().logout().await;
    Json(Success {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}
