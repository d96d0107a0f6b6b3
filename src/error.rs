//! Error taxonomy shared by every auth endpoint.
//!
//! Credential and reset failures collapse to one message per kind; a
//! response must never reveal whether an account exists.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    Conflict,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AuthError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::InvalidOrExpiredToken => "invalid_reset_token",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Unauthorized(_) => "unauthorized",
            AuthError::NotFound => "not_found",
            AuthError::Conflict => "email_exists",
            AuthError::Internal(_) => "internal_error",
        }
    }
}

/// Underlying cause of a 500, carried on the response for [`expose_error_detail`].
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if let AuthError::Internal(err) = &self {
            tracing::error!(error = ?err, "internal error");
            let mut res = (
                status,
                Json(json!({ "error": code, "message": INTERNAL_MESSAGE })),
            )
                .into_response();
            res.extensions_mut().insert(ErrorDetail(format!("{:?}", err)));
            return res;
        }

        (
            status,
            Json(json!({ "error": code, "message": self.to_string() })),
        )
            .into_response()
    }
}

/// Development-only layer: adds the internal cause to 500 bodies.
pub async fn expose_error_detail(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    match res.extensions_mut().remove::<ErrorDetail>() {
        Some(ErrorDetail(detail)) => (
            res.status(),
            Json(json!({
                "error": "internal_error",
                "message": INTERNAL_MESSAGE,
                "detail": detail,
            })),
        )
            .into_response(),
        None => res,
    }
}
