use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};
use vaxdash::{
    config::Config,
    server::{routes, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let cfg = Config::from_env()?;
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(cfg.log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) session state ────────────────────────────────────────────
    let client = Client::builder()
        .user_agent(concat!("vaxdash/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")?;
    let port = cfg.port;
    info!(
        posts = %cfg.posts_source,
        embedding = %cfg.embedding_source,
        snapshot_dir = ?cfg.snapshot_dir,
        "data sources"
    );
    let app = Arc::new(AppState::new(cfg, client));

    // ─── 3) warm the datasets in the background ──────────────────────
    // A failure here is not fatal; the first request retries the load.
    let warm = app.clone();
    tokio::spawn(async move {
        match warm.datasets().await {
            Ok(data) => info!(
                posts = data.posts.len(),
                words = data.embedding.len(),
                "datasets ready"
            ),
            Err(e) => error!("initial load failed: {:#}", e),
        }
    });

    // ─── 4) serve ────────────────────────────────────────────────────
    info!("Server starting on port {}", port);
    info!("Health check: http://localhost:{}/health", port);
    info!("Dashboard: POST http://localhost:{}/render", port);

    warp::serve(routes(app)).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
