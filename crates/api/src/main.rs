use std::sync::Arc;

use anyhow::Context;

use ipcwatch_api::app::{build_app, services::AppServices};
use ipcwatch_infra::{ServerConfig, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ipcwatch_observability::init();

    // Missing store credentials are fatal: there is nothing to serve without them.
    let store_config = StoreConfig::from_env().context("remote store configuration")?;
    let server_config = ServerConfig::from_env().context("server configuration")?;

    let services = Arc::new(AppServices::remote(&store_config)?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", server_config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
