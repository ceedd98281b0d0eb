use std::sync::Arc;

use chatgate_server::config::ServerConfig;
use chatgate_server::quota::RestQuotaStore;
use chatgate_server::upstream::UpstreamClient;
use chatgate_server::{ChatService, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatgate_server=debug".into()),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::load()?;
    let quota = Arc::new(RestQuotaStore::new(
        &config.quota_url,
        &config.quota_token,
        config.quota_limit,
        config.quota_window_secs,
    ));
    let upstream = UpstreamClient::new(&config.upstream_url, &config.upstream_key);

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(ChatService::new(config, quota, upstream));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("chatgate listening on http://{addr}");

    axum::serve(listener, app(state)).await?;
    Ok(())
}
