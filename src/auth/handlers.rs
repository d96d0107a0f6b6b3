use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
            MessageResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
            ResetTokenRequest, VerifyResetTokenResponse,
        },
        extractors::AuthUser,
        services::RESET_ACK,
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route(
            "/auth/verify-reset-token",
            get(verify_reset_token_query).post(verify_reset_token_body),
        )
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

/// Malformed or missing JSON bodies surface as validation errors.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rej| AuthError::validation(rej.body_text()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let resp = state.auth.register(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    Ok(Json(state.auth.login(body(payload)?).await?))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<ForgotPasswordResponse>, AuthError> {
    let req = body(payload)?;
    let reset_url = state.auth.request_password_reset(&req.email).await?;
    Ok(Json(ForgotPasswordResponse {
        message: RESET_ACK,
        reset_url,
    }))
}

#[instrument(skip(state, q))]
pub async fn verify_reset_token_query(
    State(state): State<AppState>,
    Query(q): Query<ResetTokenRequest>,
) -> Result<Json<VerifyResetTokenResponse>, AuthError> {
    let valid = state.auth.verify_reset_token(&q.token).await?;
    Ok(Json(VerifyResetTokenResponse { valid }))
}

#[instrument(skip(state, payload))]
pub async fn verify_reset_token_body(
    State(state): State<AppState>,
    payload: Result<Json<ResetTokenRequest>, JsonRejection>,
) -> Result<Json<VerifyResetTokenResponse>, AuthError> {
    let req = body(payload)?;
    let valid = state.auth.verify_reset_token(&req.token).await?;
    Ok(Json(VerifyResetTokenResponse { valid }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AuthError> {
    let req = body(payload)?;
    state
        .auth
        .reset_password(&req.token, &req.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset. Please log in with your new password.",
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    Ok(Json(state.auth.current_user(user_id).await?))
}
