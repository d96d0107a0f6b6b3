mod app;
mod auth;
mod clock;
mod config;
mod error;
mod mailer;
mod state;
#[cfg(test)]
mod test_logs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "travelhub_auth=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    tracing::info!(environment = ?state.config.environment, "configuration loaded");

    let auth = state.auth.clone();
    let result = app::serve(app::build_app(state)).await;

    auth.close().await;
    tracing::info!("store closed");
    result
}
