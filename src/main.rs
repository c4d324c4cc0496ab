use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

#[cfg(all(test, unix))]
mod test_support;

use config::settings::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shaderpipe=info,tower_http=info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new();
    let state = AppState::new(config);
    state
        .storage
        .ensure_dirs()
        .context("failed to create storage directories")?;

    if !state.config.tools.filter_script.is_file() {
        tracing::warn!(
            script = %state.config.tools.filter_script.display(),
            "filter script not found, shader jobs will be rejected"
        );
    }

    workers::job_reaper::start_job_reaper(
        state.shaders.jobs().clone(),
        state.config.job_retention,
        state.config.reaper_interval,
    );

    let addr = state.config.bind_addr();
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
