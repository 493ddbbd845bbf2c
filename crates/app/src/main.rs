use std::sync::Arc;

use engine::{ItemFilter, TokenFile};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "transfer_desk={level},server={level},engine={level},zoho={level}",
            level = settings.app.level
        ))
        .init();

    let port = settings.server.port;
    let client_config = settings.zoho.client_config(port);
    tracing::info!(
        organization = %client_config.organization_id,
        redirect_uri = %client_config.redirect_uri,
        api_url = %client_config.api_url,
        "using inventory organization"
    );
    let client = zoho::ZohoClient::new(client_config)?;

    let engine = engine::Engine::builder()
        .remote(Arc::new(client))
        .token_file(TokenFile::new(&settings.tokens.path))
        .seed_token(settings.tokens.seed())
        .item_filter(ItemFilter {
            require_returnable: settings.items.require_returnable,
        })
        .scope(settings.zoho.scope.as_str())
        .build()?;
    engine.warm_up().await;

    let addr = format!("{}:{}", settings.server.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    server::run_with_listener(Arc::new(engine), listener).await?;

    Ok(())
}
