//! HTTP client for the Zoho accounts (OAuth) and inventory endpoints.

use std::time::Duration;

use api_types::{
    item::ItemsPage, location::LocationsPage, transfer_order::RemoteTransferOrder,
};
use async_trait::async_trait;
use engine::{EngineError, InventoryApi, OAuthProvider, PdfStream, TokenGrant};
use futures_util::TryStreamExt;
use reqwest::{RequestBuilder, Response, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.sa";
pub const DEFAULT_API_URL: &str = "https://www.zohoapis.sa/inventory/v1";
pub const DEFAULT_SCOPE: &str = "ZohoInventory.fullaccess.all";

#[derive(Debug, thiserror::Error)]
pub enum ZohoError {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct ZohoConfig {
    pub accounts_url: String,
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub organization_id: String,
    /// Unset keeps the reqwest defaults, which never time out.
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct ZohoClient {
    http: reqwest::Client,
    accounts_url: Url,
    api_url: Url,
    config: ZohoConfig,
}

fn parse_base(raw: &str) -> Result<Url, ZohoError> {
    let url = Url::parse(raw).map_err(|err| ZohoError::InvalidUrl(format!("{raw}: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(ZohoError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Remote error payload: the JSON body when there is one, the raw text
/// otherwise.
fn details_from_text(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Interprets a token endpoint answer. Zoho reports failures either with a
/// non-2xx status or with a 200 carrying an `error` field.
fn interpret_grant(status: StatusCode, body: Value) -> Result<TokenGrant, Value> {
    if !status.is_success() || body.get("error").is_some() {
        return Err(body);
    }
    let Some(access_token) = body.get("access_token").and_then(Value::as_str) else {
        return Err(body);
    };
    Ok(TokenGrant {
        access_token: access_token.to_string(),
        refresh_token: body
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string),
        expires_in: body.get("expires_in").and_then(Value::as_i64),
    })
}

impl ZohoClient {
    pub fn new(config: ZohoConfig) -> Result<Self, ZohoError> {
        let accounts_url = parse_base(&config.accounts_url)?;
        let api_url = parse_base(&config.api_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            accounts_url,
            api_url,
            config,
        })
    }

    fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .header(
                header::AUTHORIZATION,
                format!("Zoho-oauthtoken {access_token}"),
            )
            .query(&[("organization_id", self.config.organization_id.as_str())])
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, Value> {
        let url = endpoint(&self.accounts_url, &["oauth", "v2", "token"]);
        let res = self
            .http
            .post(url)
            .query(params)
            .send()
            .await
            .map_err(|err| Value::String(err.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|err| Value::String(err.to_string()))?;
        interpret_grant(status, details_from_text(text))
    }

    /// Sends `request` and fails with the remote payload on non-2xx answers.
    async fn send(&self, request: RequestBuilder) -> Result<Response, EngineError> {
        let res = request
            .send()
            .await
            .map_err(|err| EngineError::transport(err.to_string()))?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let details = match res.text().await {
            Ok(text) => details_from_text(text),
            Err(err) => Value::String(err.to_string()),
        };
        tracing::error!("remote answered {status}: {details}");
        Err(EngineError::Upstream {
            status: Some(status.as_u16()),
            details,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, EngineError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| EngineError::ResponseParse(err.to_string()))
    }
}

#[async_trait]
impl OAuthProvider for ZohoClient {
    fn authorize_url(&self, scope: &str) -> String {
        let mut url = endpoint(&self.accounts_url, &["oauth", "v2", "auth"]);
        url.query_pairs_mut()
            .append_pair("scope", scope)
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("access_type", "offline");
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, EngineError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("redirect_uri", &self.config.redirect_uri),
            ("code", code),
        ])
        .await
        .map_err(|details| {
            tracing::error!("token exchange rejected: {details}");
            EngineError::AuthExchange(details)
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, EngineError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("refresh_token", refresh_token),
        ])
        .await
        .map_err(EngineError::Refresh)
    }
}

#[async_trait]
impl InventoryApi for ZohoClient {
    async fn items_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ItemsPage, EngineError> {
        let request = self
            .authorized(self.http.get(endpoint(&self.api_url, &["items"])), access_token)
            .query(&[("per_page", per_page), ("page", page)]);
        self.json(request).await
    }

    async fn locations(&self, access_token: &str) -> Result<LocationsPage, EngineError> {
        let request =
            self.authorized(self.http.get(endpoint(&self.api_url, &["locations"])), access_token);
        self.json(request).await
    }

    async fn create_transfer_order(
        &self,
        access_token: &str,
        order: &RemoteTransferOrder,
    ) -> Result<Value, EngineError> {
        let request = self
            .authorized(
                self.http.post(endpoint(&self.api_url, &["transferorders"])),
                access_token,
            )
            .json(order);
        self.json(request).await
    }

    async fn transfer_order_pdf(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<PdfStream, EngineError> {
        let request = self
            .authorized(
                self.http
                    .get(endpoint(&self.api_url, &["transferorders", id])),
                access_token,
            )
            .header(header::ACCEPT, "application/pdf");
        let res = self.send(request).await?;
        Ok(Box::pin(res.bytes_stream().map_err(std::io::Error::other)))
    }
}
