use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;

use crate::{
    auth::{
        jwt::JwtKeys, password::warm_up_dummy_hash, repo::PgUserStore, services::AuthService,
    },
    clock::SystemClock,
    config::AppConfig,
    mailer::{LogMailer, Mailer, SmtpMailer},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migrations failed; continuing");
        }

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                tracing::warn!("SMTP_HOST not set; reset emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        warm_up_dummy_hash()
            .await
            .context("build dummy password hash")?;

        let auth = AuthService::new(
            Arc::new(PgUserStore::new(db)),
            mailer,
            Arc::new(SystemClock),
            JwtKeys::new(&config.jwt),
            config.reset.clone(),
            config.environment.exposes_reset_links(),
        );

        Ok(Self { config, auth })
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[cfg(test)]
pub use fake::Fake;
