use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
use serde_json::Value;
pub use server::{ServerState, router, run_with_listener};

mod auth;
mod inventory;
mod server;
mod transfer_orders;

pub enum ServerError {
    /// Engine failure while performing `action`, e.g. "Failed to fetch items".
    Engine {
        action: &'static str,
        err: EngineError,
    },
    /// Request body that is not valid JSON for the route.
    InvalidBody(JsonRejection),
    Generic(String),
}

impl ServerError {
    pub fn failed(action: &'static str) -> impl FnOnce(EngineError) -> ServerError {
        move |err| ServerError::Engine { action, err }
    }
}

#[derive(Serialize)]
struct Error {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

const UNKNOWN_ITEM_DETAILS: &str =
    "This item is not available in the current inventory list. Please refresh and try again.";

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotAuthenticated | EngineError::NoRefreshToken | EngineError::Refresh(_) => {
            StatusCode::UNAUTHORIZED
        }
        EngineError::AuthExchange(_)
        | EngineError::UnknownItem(_)
        | EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::Upstream { .. } | EngineError::ResponseParse(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn body_for_engine_error(action: &str, err: EngineError) -> Error {
    let details = err.details();
    match err {
        EngineError::NotAuthenticated => Error {
            error: "Not authenticated. Please login first.".to_string(),
            details: None,
        },
        EngineError::NoRefreshToken | EngineError::Refresh(_) => Error {
            error: "Authentication failed. Please login again.".to_string(),
            details,
        },
        EngineError::AuthExchange(_) => Error {
            error: "Failed to exchange code for token".to_string(),
            details,
        },
        EngineError::UnknownItem(_) => Error {
            error: err.to_string(),
            details: Some(Value::String(UNKNOWN_ITEM_DETAILS.to_string())),
        },
        EngineError::Validation(msg) => Error {
            error: msg,
            details: None,
        },
        EngineError::Upstream { .. } | EngineError::ResponseParse(_) => {
            tracing::error!("{action}: {err}");
            Error {
                error: action.to_string(),
                details,
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine { action, err } => {
                (status_for_engine_error(&err), body_for_engine_error(action, err))
            }
            ServerError::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                Error {
                    error: "Invalid request body".to_string(),
                    details: Some(Value::String(rejection.body_text())),
                },
            ),
            ServerError::Generic(error) => (
                StatusCode::BAD_REQUEST,
                Error {
                    error,
                    details: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine {
            action: "Remote request failed",
            err: value,
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::InvalidBody(value)
    }
}
