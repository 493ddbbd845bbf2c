use std::{collections::HashMap, sync::Arc};

use api_types::{
    item::Item,
    location::LocationsResponse,
    transfer_order::{CreatedTransferOrder, TransferOrderNew},
};
use chrono::Utc;
use serde_json::Value;

pub use cart::{Cart, CartLine, QuantityEntry};
pub use catalog::{ItemFilter, PASSTHROUGH_UNIT, flatten_locations, search_items};
pub use error::EngineError;
pub use remote::{InventoryApi, OAuthProvider, PdfStream, TokenGrant};
pub use tokens::{REFRESH_WINDOW_MS, Token, TokenFile, TokenStore};
pub use units::{Container, UnitInfo};

pub mod cart;
pub mod catalog;
mod error;
mod remote;
mod tokens;
pub mod units;

type ResultEngine<T> = Result<T, EngineError>;

/// Page size used when walking the remote item catalog.
pub const ITEMS_PER_PAGE: u32 = 1000;

/// Outcome of a transfer order submission.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferOrderReceipt {
    pub transfer_order_id: Option<String>,
    pub transfer_order_number: Option<String>,
    /// Remote response, forwarded as is.
    pub body: Value,
}

impl TransferOrderReceipt {
    fn from_body(body: Value) -> Self {
        let created = body
            .get("transfer_order")
            .cloned()
            .and_then(|order| serde_json::from_value::<CreatedTransferOrder>(order).ok())
            .unwrap_or_default();
        Self {
            transfer_order_id: created.transfer_order_id,
            transfer_order_number: created.transfer_order_number,
            body,
        }
    }
}

/// Proxy between the browser UI and the remote inventory API.
///
/// Every remote call first obtains a valid access token from the
/// [`TokenStore`]; when that fails nothing is sent remotely.
pub struct Engine {
    tokens: TokenStore,
    inventory: Arc<dyn InventoryApi>,
    filter: ItemFilter,
    scope: String,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Authorize URL for the configured scope, or `custom_scope` when given.
    pub fn login_url(&self, custom_scope: Option<&str>) -> String {
        let scope = custom_scope
            .map(str::trim)
            .filter(|scope| !scope.is_empty())
            .unwrap_or(self.scope.as_str());
        self.tokens.authorize_url(scope)
    }

    /// Refreshes an expiring token loaded at startup. Failures are logged and
    /// otherwise ignored.
    pub async fn warm_up(&self) {
        match self.tokens.refresh_if_expiring().await {
            Ok(true) => tracing::info!("startup token refresh done"),
            Ok(false) => {}
            Err(err) => tracing::warn!("startup token refresh failed: {err}"),
        }
    }

    /// Whole remote catalog, unfiltered.
    async fn fetch_catalog(&self, access_token: &str) -> ResultEngine<Vec<Item>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .inventory
                .items_page(access_token, page, ITEMS_PER_PAGE)
                .await?;
            let count = batch.items.len();
            let has_more = batch
                .page_context
                .as_ref()
                .and_then(|ctx| ctx.has_more_page)
                .unwrap_or(true);
            items.extend(batch.items);
            tracing::debug!("items page {page}: {count} items, total {}", items.len());

            if count < ITEMS_PER_PAGE as usize || !has_more {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// Transferable inventory items.
    pub async fn list_items(&self) -> ResultEngine<Vec<Item>> {
        let access_token = self.tokens.ensure_valid().await?;
        let all = self.fetch_catalog(&access_token).await?;
        let total = all.len();
        let items = self.filter.apply(all);
        tracing::info!("filtered to {} inventory items from {total}", items.len());
        Ok(items)
    }

    pub async fn list_locations(&self) -> ResultEngine<LocationsResponse> {
        let access_token = self.tokens.ensure_valid().await?;
        let remote = self.inventory.locations(&access_token).await?;
        let locations = flatten_locations(&remote.locations);
        tracing::info!(
            "found {} transfer locations in {} remote locations",
            locations.len(),
            remote.locations.len()
        );
        Ok(LocationsResponse {
            code: remote.code,
            message: remote.message,
            locations,
        })
    }

    /// Validates `order` against a freshly fetched catalog and submits it.
    ///
    /// The catalog is fetched on every call so that names and ids always come
    /// from the remote rather than from what the UI loaded earlier.
    pub async fn create_transfer_order(
        &self,
        order: TransferOrderNew,
    ) -> ResultEngine<TransferOrderReceipt> {
        catalog::validate_order(&order)?;
        let access_token = self.tokens.ensure_valid().await?;

        let names: HashMap<String, String> = self
            .fetch_catalog(&access_token)
            .await?
            .into_iter()
            .map(|item| (item.item_id, item.name))
            .collect();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let payload = catalog::remote_order(&order, &names, &today)?;

        let body = self
            .inventory
            .create_transfer_order(&access_token, &payload)
            .await?;
        let receipt = TransferOrderReceipt::from_body(body);
        tracing::info!(
            id = receipt.transfer_order_id.as_deref().unwrap_or("?"),
            number = receipt.transfer_order_number.as_deref().unwrap_or("?"),
            lines = payload.line_items.len(),
            "transfer order created"
        );
        Ok(receipt)
    }

    pub async fn transfer_order_pdf(&self, id: &str) -> ResultEngine<PdfStream> {
        let access_token = self.tokens.ensure_valid().await?;
        self.inventory.transfer_order_pdf(&access_token, id).await
    }
}

#[derive(Default)]
pub struct EngineBuilder {
    oauth: Option<Arc<dyn OAuthProvider>>,
    inventory: Option<Arc<dyn InventoryApi>>,
    token_file: Option<TokenFile>,
    seed: Token,
    filter: ItemFilter,
    scope: String,
}

impl EngineBuilder {
    /// Use `client` both for OAuth and inventory calls.
    pub fn remote<C>(self, client: Arc<C>) -> EngineBuilder
    where
        C: OAuthProvider + InventoryApi + 'static,
    {
        self.oauth(client.clone()).inventory(client)
    }

    pub fn oauth(mut self, oauth: Arc<dyn OAuthProvider>) -> EngineBuilder {
        self.oauth = Some(oauth);
        self
    }

    pub fn inventory(mut self, inventory: Arc<dyn InventoryApi>) -> EngineBuilder {
        self.inventory = Some(inventory);
        self
    }

    pub fn token_file(mut self, file: TokenFile) -> EngineBuilder {
        self.token_file = Some(file);
        self
    }

    /// Token used when no persisted record exists.
    pub fn seed_token(mut self, seed: Token) -> EngineBuilder {
        self.seed = seed;
        self
    }

    pub fn item_filter(mut self, filter: ItemFilter) -> EngineBuilder {
        self.filter = filter;
        self
    }

    /// Default OAuth scope requested at login.
    pub fn scope(mut self, scope: impl Into<String>) -> EngineBuilder {
        self.scope = scope.into();
        self
    }

    /// Construct `Engine`, loading the persisted token.
    pub fn build(self) -> ResultEngine<Engine> {
        let oauth = self
            .oauth
            .ok_or_else(|| EngineError::Validation("missing OAuth provider".to_string()))?;
        let inventory = self
            .inventory
            .ok_or_else(|| EngineError::Validation("missing inventory client".to_string()))?;
        let file = self
            .token_file
            .unwrap_or_else(|| TokenFile::new("tokens.json"));

        Ok(Engine {
            tokens: TokenStore::load(file, self.seed, oauth),
            inventory,
            filter: self.filter,
            scope: self.scope,
        })
    }
}
