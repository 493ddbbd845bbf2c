//! The module contains the errors the engine can throw.
//!
//! Authentication state errors ([`NotAuthenticated`], [`NoRefreshToken`],
//! [`Refresh`]) mean the user has to log in again; [`Upstream`] carries the
//! payload the remote inventory API answered with.
//!
//!  [`NotAuthenticated`]: EngineError::NotAuthenticated
//!  [`NoRefreshToken`]: EngineError::NoRefreshToken
//!  [`Refresh`]: EngineError::Refresh
//!  [`Upstream`]: EngineError::Upstream
use serde_json::Value;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("authorization code exchange failed: {0}")]
    AuthExchange(Value),
    #[error("token refresh failed: {0}")]
    Refresh(Value),
    #[error("upstream request failed: {details}")]
    Upstream { status: Option<u16>, details: Value },
    #[error("Item {0} not found in inventory")]
    UnknownItem(String),
    #[error("malformed response: {0}")]
    ResponseParse(String),
    #[error("{0}")]
    Validation(String),
}

impl EngineError {
    /// Upstream failure without an HTTP status, e.g. a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            details: Value::String(message.into()),
        }
    }

    /// Whether the caller has to go through the login flow again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::NoRefreshToken | Self::Refresh(_)
        )
    }

    /// Remote payload or message worth forwarding to the client.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::AuthExchange(details)
            | Self::Refresh(details)
            | Self::Upstream { details, .. } => Some(details.clone()),
            Self::ResponseParse(msg) => Some(Value::String(msg.clone())),
            _ => None,
        }
    }
}
