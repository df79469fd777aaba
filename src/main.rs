use anyhow::Context;
use askpdf::{api, config, logging, processing::RagService, store::spawn_session_sweeper};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("Failed to load configuration")?;
    logging::init_tracing();
    config.log_summary();

    let service = RagService::from_config(&config)
        .await
        .context("Failed to initialize document service")?;

    if let Some(ttl) = config.session_ttl {
        tracing::info!(ttl_secs = ttl.as_secs(), "Session eviction enabled");
        spawn_session_sweeper(service.store().clone(), ttl);
    } else {
        tracing::info!("Session eviction disabled");
    }

    let app = api::create_router(Arc::new(service), config.max_upload_bytes);

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.server_port))?;
    tracing::info!("Listening on http://0.0.0.0:{}", config.server_port);
    axum::serve(listener, app).await.context("Server terminated")?;
    Ok(())
}
