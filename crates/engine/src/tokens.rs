//! OAuth token lifecycle.
//!
//! [`TokenStore`] owns the process-wide token record. Every mutation happens
//! with the record locked and is followed by a whole-file write through
//! [`TokenFile`], so concurrent requests never refresh twice nor observe a
//! half-updated token.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use api_types::auth::AuthStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    EngineError, ResultEngine,
    remote::{OAuthProvider, TokenGrant},
};

/// Tokens are refreshed when they expire within this window.
pub const REFRESH_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: Option<i64>,
}

impl Token {
    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// True when no expiry is known or `now_ms` is inside the refresh window.
    pub fn needs_refresh(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now_ms + REFRESH_WINDOW_MS >= expires_at,
            None => true,
        }
    }

    pub fn expires_in_secs(&self, now_ms: i64) -> Option<i64> {
        self.expires_at
            .map(|expires_at| ((expires_at - now_ms) / 1000).max(0))
    }

    pub fn status(&self, now_ms: i64) -> AuthStatus {
        let expires_in = self.expires_in_secs(now_ms);
        AuthStatus {
            authenticated: self.access_token.is_some(),
            has_refresh_token: self.refresh_token.is_some(),
            token_expires_in: expires_in,
            token_expires_in_minutes: expires_in.map(|secs| secs / 60),
            auto_refresh_enabled: true,
            will_refresh_in: expires_in.map(|secs| (secs - REFRESH_WINDOW_MS / 1000).max(0)),
        }
    }
}

fn expires_at(grant: &TokenGrant, now_ms: i64) -> i64 {
    let lifetime = grant
        .expires_in
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    now_ms + lifetime * 1000
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedToken {
    #[serde(flatten)]
    token: Token,
    saved_at: Option<DateTime<Utc>>,
}

/// JSON file holding the token record.
///
/// Writes replace the whole file (temp file + rename). When the configured
/// path is not writable the record goes to the system temp directory instead.
#[derive(Clone, Debug)]
pub struct TokenFile {
    primary: PathBuf,
    fallback: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let primary = path.into();
        let name = primary
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "tokens.json".into());
        let fallback = std::env::temp_dir().join(name);
        Self { primary, fallback }
    }

    pub fn with_fallback(path: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: path.into(),
            fallback: fallback.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.primary
    }

    /// Reads the first complete record. A missing, empty or corrupt file is
    /// not an error.
    pub fn load(&self) -> Option<Token> {
        [&self.primary, &self.fallback]
            .into_iter()
            .find_map(|path| read_token(path))
    }

    pub fn save(&self, token: &Token) -> io::Result<PathBuf> {
        let record = PersistedToken {
            token: token.clone(),
            saved_at: Some(Utc::now()),
        };
        let payload = serde_json::to_string_pretty(&record)?;

        match write_atomic(&self.primary, &payload) {
            Ok(()) => Ok(self.primary.clone()),
            Err(err) if self.fallback != self.primary => {
                tracing::warn!(
                    "cannot write tokens to {}: {err}, using {}",
                    self.primary.display(),
                    self.fallback.display()
                );
                write_atomic(&self.fallback, &payload)?;
                Ok(self.fallback.clone())
            }
            Err(err) => Err(err),
        }
    }

    /// Deletes every persisted copy. Failures are logged only.
    pub fn clear(&self) {
        for path in [&self.primary, &self.fallback] {
            match fs::remove_file(path) {
                Ok(()) => tracing::info!("deleted token file {}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => tracing::error!("failed to delete {}: {err}", path.display()),
            }
        }
    }
}

fn read_token(path: &Path) -> Option<Token> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!("failed to read {}: {err}", path.display());
            return None;
        }
    };
    if content.trim().is_empty() {
        tracing::warn!("token file {} is empty", path.display());
        return None;
    }
    match serde_json::from_str::<PersistedToken>(&content) {
        Ok(record) if !record.token.is_empty() => {
            tracing::info!("loaded saved tokens from {}", path.display());
            Some(record.token)
        }
        Ok(_) => {
            tracing::warn!("token file {} is incomplete", path.display());
            None
        }
        Err(err) => {
            tracing::warn!("token file {} is corrupt: {err}", path.display());
            None
        }
    }
}

fn write_atomic(path: &Path, payload: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)
}

/// Owner of the current token.
pub struct TokenStore {
    token: Mutex<Token>,
    file: TokenFile,
    oauth: Arc<dyn OAuthProvider>,
}

impl TokenStore {
    /// Loads the persisted token, falling back to `seed` (token material from
    /// the environment) when no complete record exists. A persisted record
    /// without a refresh token takes the seed's one.
    pub fn load(file: TokenFile, seed: Token, oauth: Arc<dyn OAuthProvider>) -> Self {
        let token = match file.load() {
            Some(mut token) => {
                if token.refresh_token.is_none() && seed.refresh_token.is_some() {
                    tracing::info!("using refresh token from the environment");
                    token.refresh_token = seed.refresh_token;
                }
                token
            }
            None if !seed.is_empty() => {
                tracing::info!("using token material from the environment");
                seed
            }
            None => Token::default(),
        };
        if let Some(secs) = token.expires_in_secs(now_ms()) {
            tracing::info!("token expires in {secs} seconds");
        }
        Self {
            token: Mutex::new(token),
            file,
            oauth,
        }
    }

    pub async fn snapshot(&self) -> Token {
        self.token.lock().await.clone()
    }

    pub async fn status(&self) -> AuthStatus {
        self.token.lock().await.status(now_ms())
    }

    pub fn authorize_url(&self, scope: &str) -> String {
        self.oauth.authorize_url(scope)
    }

    /// Trades an authorization code for a token and persists it.
    pub async fn exchange_code(&self, code: &str) -> ResultEngine<Token> {
        let grant = self.oauth.exchange_code(code).await?;

        let mut token = self.token.lock().await;
        let refresh_token = grant.refresh_token.clone().or(token.refresh_token.take());
        *token = Token {
            access_token: Some(grant.access_token.clone()),
            refresh_token,
            expires_at: Some(expires_at(&grant, now_ms())),
        };
        self.persist(&token);
        tracing::info!("authorization code exchanged");
        Ok(token.clone())
    }

    /// Returns an access token that stays valid for at least the refresh
    /// window, refreshing it first when needed.
    pub async fn ensure_valid(&self) -> ResultEngine<String> {
        let mut token = self.token.lock().await;
        if token.is_empty() {
            return Err(EngineError::NotAuthenticated);
        }
        if token.access_token.is_none() || token.needs_refresh(now_ms()) {
            self.refresh_locked(&mut token).await?;
        }
        token.access_token.clone().ok_or(EngineError::NotAuthenticated)
    }

    pub async fn refresh(&self) -> ResultEngine<Token> {
        let mut token = self.token.lock().await;
        self.refresh_locked(&mut token).await?;
        Ok(token.clone())
    }

    /// Refreshes once if a refresh token is held and the access token is
    /// missing or expiring. Returns whether a refresh happened.
    pub async fn refresh_if_expiring(&self) -> ResultEngine<bool> {
        let mut token = self.token.lock().await;
        if token.refresh_token.is_none()
            || (token.access_token.is_some() && !token.needs_refresh(now_ms()))
        {
            return Ok(false);
        }
        self.refresh_locked(&mut token).await?;
        Ok(true)
    }

    /// Forgets the token and deletes the persisted copy.
    pub async fn logout(&self) {
        *self.token.lock().await = Token::default();
        self.file.clear();
        tracing::info!("logged out, tokens cleared");
    }

    async fn refresh_locked(&self, token: &mut Token) -> ResultEngine<()> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or(EngineError::NoRefreshToken)?;

        tracing::info!("refreshing access token");
        let grant = match self.oauth.refresh(&refresh_token).await {
            Ok(grant) => grant,
            Err(err) => {
                tracing::error!("token refresh failed: {err}");
                return Err(match err {
                    EngineError::Refresh(details) => EngineError::Refresh(details),
                    other => EngineError::Refresh(serde_json::Value::String(other.to_string())),
                });
            }
        };

        token.access_token = Some(grant.access_token.clone());
        token.expires_at = Some(expires_at(&grant, now_ms()));
        self.persist(token);
        tracing::info!("access token refreshed");
        Ok(())
    }

    fn persist(&self, token: &Token) {
        match self.file.save(token) {
            Ok(path) => tracing::info!("tokens saved to {}", path.display()),
            Err(err) => tracing::error!("failed to save tokens: {err}"),
        }
    }
}
