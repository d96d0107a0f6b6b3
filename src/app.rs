use std::{net::SocketAddr, time::Duration};

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth,
    error::{expose_error_detail, AuthError},
    state::AppState,
};

pub fn build_app(state: AppState) -> Router {
    let expose_detail = state.config.environment.exposes_error_detail();

    let mut app = Router::new()
        .merge(auth::router())
        .route("/health", get(|| async { "ok" }))
        .fallback(|| async { AuthError::NotFound })
        .with_state(state);

    if expose_detail {
        app = app.layer(middleware::from_fn(expose_error_detail));
    }

    app.layer(CorsLayer::permissive()).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                // Path only: the query may carry a reset token.
                let method = req.method().clone();
                let path = req.uri().path().to_owned();
                tracing::info_span!(
                    "http_request",
                    %method,
                    path = %path,
                    status = tracing::field::Empty
                )
            })
            .on_response(
                |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    if status.is_server_error() {
                        tracing::error!(%status, ?latency, "response");
                    } else {
                        tracing::info!(%status, ?latency, "response");
                    }
                },
            ),
    )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Environment, mailer::RecordingMailer, test_logs};

    #[tokio::test]
    async fn request_log_omits_query_string() {
        let (mailer, mut rx) = RecordingMailer::new();
        let fake = AppState::fake(Environment::Production, Arc::new(mailer));
        let app = build_app(fake.state.clone());

        let res = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/auth/register")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"email":"alice@example.com","password":"password123"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        fake.state
            .auth
            .request_password_reset("alice@example.com")
            .await
            .unwrap();
        let (_, url) = rx.recv().await.unwrap();
        let token = url.rsplit("token=").next().unwrap().to_owned();

        let (logs, _guard) = test_logs::capture();
        let res = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/auth/verify-reset-token?token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let res = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/auth/verify-reset-token?token=SUPERSECRETRESETTOKEN")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let logs = logs.contents();
        assert!(logs.contains("http_request"));
        assert!(logs.contains("/auth/verify-reset-token"));
        assert!(!logs.contains(&token));
        assert!(!logs.contains("SUPERSECRETRESETTOKEN"));
    }
}
