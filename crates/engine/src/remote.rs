//! Seams to the remote inventory service.
//!
//! The engine only talks to the remote through these traits; the `zoho` crate
//! implements them over HTTP and tests use in-process fakes.

use api_types::{
    item::ItemsPage, location::LocationsPage, transfer_order::RemoteTransferOrder,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::ResultEngine;

/// Body of a PDF download, forwarded chunk by chunk.
pub type PdfStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Successful answer of the OAuth token endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: Option<i64>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the browser is sent to for consent.
    fn authorize_url(&self, scope: &str) -> String;

    async fn exchange_code(&self, code: &str) -> ResultEngine<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> ResultEngine<TokenGrant>;
}

#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn items_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> ResultEngine<ItemsPage>;

    async fn locations(&self, access_token: &str) -> ResultEngine<LocationsPage>;

    /// Returns the remote response body untouched.
    async fn create_transfer_order(
        &self,
        access_token: &str,
        order: &RemoteTransferOrder,
    ) -> ResultEngine<Value>;

    async fn transfer_order_pdf(&self, access_token: &str, id: &str) -> ResultEngine<PdfStream>;
}
