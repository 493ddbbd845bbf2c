//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `TRANSFER_*` environment variables,
//! e.g. `TRANSFER_ZOHO__CLIENT_ID`.
use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

fn default_accounts_url() -> String {
    zoho::DEFAULT_ACCOUNTS_URL.to_string()
}

fn default_api_url() -> String {
    zoho::DEFAULT_API_URL.to_string()
}

fn default_scope() -> String {
    zoho::DEFAULT_SCOPE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct Zoho {
    pub client_id: String,
    pub client_secret: String,
    pub organization_id: String,
    pub redirect_uri: Option<String>,
    /// Public URL of the deployment, used to derive the OAuth redirect.
    pub public_url: Option<String>,
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    pub timeout_secs: Option<u64>,
}

impl Zoho {
    /// Explicit redirect URI, else the callback route on the public URL,
    /// else on localhost.
    pub fn redirect_uri(&self, port: u16) -> String {
        if let Some(uri) = self.redirect_uri.as_deref().filter(|uri| !uri.is_empty()) {
            return uri.to_string();
        }
        match self.public_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => format!("{}/auth/callback", url.trim_end_matches('/')),
            None => format!("http://localhost:{port}/auth/callback"),
        }
    }

    pub fn client_config(&self, port: u16) -> zoho::ZohoConfig {
        zoho::ZohoConfig {
            accounts_url: self.accounts_url.clone(),
            api_url: self.api_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri(port),
            organization_id: self.organization_id.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Token file location and the token material used when the file is absent.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Tokens {
    pub path: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}

impl Default for Tokens {
    fn default() -> Self {
        Self {
            path: "tokens.json".to_string(),
            access_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }
}

impl Tokens {
    pub fn seed(&self) -> engine::Token {
        engine::Token {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Items {
    pub require_returnable: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub zoho: Zoho,
    #[serde(default)]
    pub tokens: Tokens,
    #[serde(default)]
    pub items: Items,
}

#[derive(Debug, Parser)]
#[command(name = "transfer_desk", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        let config = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix("TRANSFER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config, std::env::var("PORT").ok())
    }

    /// Deserializes `config`; a `PORT` value takes precedence over
    /// `server.port`.
    fn from_config(config: Config, port: Option<String>) -> Result<Self, ConfigError> {
        let mut settings: Settings = config.try_deserialize()?;
        if let Some(port) = port {
            settings.server.port = port
                .trim()
                .parse()
                .map_err(|err| ConfigError::Message(format!("invalid PORT {port:?}: {err}")))?;
        }
        Ok(settings)
    }
}
