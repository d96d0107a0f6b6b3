//! Registration, login, session verification and the password-reset lifecycle.
//!
//! Reset tokens move through `none -> pending(token, expiry) -> none`. A new
//! request overwrites a pending token; a successful reset or an elapsed
//! expiry ends it. Only the latest token is ever honoured.

use std::sync::Arc;

use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use regex::Regex;
use time::Duration;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking, MIN_PASSWORD_LEN},
        repo::{StoreError, UserStore},
        repo_types::NewUser,
    },
    clock::Clock,
    config::ResetConfig,
    error::AuthError,
    mailer::Mailer,
};

pub const RESET_ACK: &str =
    "If an account with that email exists, password reset instructions have been sent.";

const RESET_TOKEN_LEN: usize = 48;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn generate_reset_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    keys: JwtKeys,
    reset: ResetConfig,
    expose_reset_links: bool,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        keys: JwtKeys,
        reset: ResetConfig,
        expose_reset_links: bool,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            keys,
            reset,
            expose_reset_links,
        }
    }

    /// Releases the store's connections.
    pub async fn close(&self) {
        self.store.close().await;
    }

    fn session_for(&self, user: PublicUser) -> Result<AuthResponse, AuthError> {
        let token = self.keys.sign(user.id, &user.email)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&req.email);
        if email.is_empty() || req.password.is_empty() {
            return Err(AuthError::validation("Email and password are required"));
        }
        if !is_valid_email(&email) {
            warn!("registration with invalid email");
            return Err(AuthError::validation("Invalid email"));
        }
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::validation("Password too short"));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            warn!("registration for existing email");
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password_blocking(req.password).await?;
        let new_user = NewUser {
            email,
            password_hash,
            first_name: non_empty(req.first_name),
            last_name: non_empty(req.last_name),
        };
        let user = match self.store.create(&new_user).await {
            Ok(u) => u,
            Err(StoreError::DuplicateEmail) => {
                warn!("email registered concurrently");
                return Err(AuthError::Conflict);
            }
            Err(StoreError::Other(e)) => return Err(e.into()),
        };

        info!(user_id = user.id, "user registered");
        self.session_for(user.into())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&req.email);
        if email.is_empty() || req.password.is_empty() {
            return Err(AuthError::validation("Email and password are required"));
        }

        let user = self.store.find_by_email(&email).await?;
        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let ok = verify_password_blocking(req.password, hash).await?;

        match user {
            Some(user) if ok => {
                info!(user_id = user.id, "user logged in");
                self.session_for(user.into())
            }
            Some(user) => {
                warn!(user_id = user.id, "login invalid password");
                Err(AuthError::InvalidCredentials)
            }
            None => {
                warn!("login for unknown email");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Stores a fresh reset token when the account exists and hands the link
    /// to the mailer without waiting for delivery. Returns the link only when
    /// the environment exposes reset links.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::validation("Email is required"));
        }

        let Some(user) = self.store.find_by_email(&email).await? else {
            debug!("password reset for unknown email");
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = self.clock.now() + Duration::minutes(self.reset.ttl_minutes);
        self.store
            .set_reset_token(user.id, &token, expires_at)
            .await?;
        let reset_url = self.reset.reset_url(&token);
        info!(user_id = user.id, %expires_at, "password reset token issued");

        let mailer = Arc::clone(&self.mailer);
        let to = user.email.clone();
        let url = reset_url.clone();
        let user_id = user.id;
        tokio::spawn(async move {
            if let Err(e) = mailer.send_password_reset(&to, &url).await {
                warn!(error = %e, user_id, "password reset email failed");
            }
        });

        Ok(self.expose_reset_links.then_some(reset_url))
    }

    pub async fn verify_reset_token(&self, token: &str) -> Result<bool, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::validation("Token is required"));
        }
        let user = self
            .store
            .find_by_reset_token(token, self.clock.now())
            .await?;
        Ok(user.is_some())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let token = token.trim();
        if token.is_empty() || new_password.is_empty() {
            return Err(AuthError::validation("Token and new password are required"));
        }
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::validation("Password too short"));
        }

        let hash = hash_password_blocking(new_password.to_string()).await?;
        let now = self.clock.now();
        if !self.store.consume_reset_token(token, now, &hash).await? {
            if self.store.clear_expired_reset_token(token, now).await? {
                info!("expired reset token cleared");
            }
            warn!("reset attempted with invalid or expired token");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        info!("password reset completed");
        Ok(())
    }

    /// Validates a bearer token and returns the user id it was issued for.
    pub fn verify_session(&self, token: &str) -> Result<i64, AuthError> {
        match self.keys.verify(token) {
            Ok(claims) => Ok(claims.sub),
            Err(e) => {
                debug!(error = %e, "session token rejected");
                Err(AuthError::Unauthorized("Invalid or expired token"))
            }
        }
    }

    pub async fn current_user(&self, user_id: i64) -> Result<PublicUser, AuthError> {
        match self.store.find_by_id(user_id).await? {
            Some(user) => Ok(user.into()),
            None => {
                warn!(user_id, "session for missing user");
                Err(AuthError::Unauthorized("User not found"))
            }
        }
    }
}
