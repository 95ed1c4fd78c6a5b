use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use profile_picture_rmcp::{AppContext, config::AppConfig, routes};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profile_picture_rmcp=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; generation requests will fail");
    }
    if config.public_base_url_is_fallback {
        tracing::warn!(
            public_base_url = %config.public_base_url,
            "PUBLIC_BASE_URL is not set; signed URLs use the bind address"
        );
    }
    tokio::fs::create_dir_all(&config.data_dir).await?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        public_base_url = %config.public_base_url,
        "Storage configured"
    );

    let ctx = Arc::new(AppContext::from_config(&config)?);
    let mcp_path = config.mcp_path();
    let router = routes::router(ctx, &mcp_path);

    let bind_address = config.bind_address();
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Profile picture server started at http://{bind_address} (MCP at {mcp_path})");

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
