//! Transfer order API endpoints

use api_types::transfer_order::TransferOrderNew;
use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{ServerError, server::ServerState};

/// Handle requests for creating a transfer order. Answers with the remote
/// response body unchanged.
pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<TransferOrderNew>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(payload) = payload?;
    let receipt = state
        .engine
        .create_transfer_order(payload)
        .await
        .map_err(ServerError::failed("Failed to create transfer order"))?;

    Ok(Json(receipt.body))
}

/// Remote transfer order ids are numeric; anything outside `[A-Za-z0-9_-]`
/// cannot go into the attachment file name.
fn is_transfer_order_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Stream the transfer order PDF from the remote.
pub async fn pdf(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    if !is_transfer_order_id(&id) {
        return Err(ServerError::Generic(format!(
            "Invalid transfer order id {id:?}"
        )));
    }

    let stream = state
        .engine
        .transfer_order_pdf(&id)
        .await
        .map_err(ServerError::failed("Failed to download PDF"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"TransferOrder-{id}.pdf\""),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
