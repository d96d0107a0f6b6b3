use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    // Compared against when the email is unknown so login timing stays flat.
    static ref DUMMY_HASH: String =
        hash_password("travelhub-dummy-password").unwrap_or_default();
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Hashes on the blocking pool so request workers are not stalled.
pub async fn hash_password_blocking(plain: String) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| AuthError::Internal(e.into()))??;
    Ok(hash)
}

/// Builds the dummy hash up front so the first unknown-email login costs the
/// same as any other.
pub async fn warm_up_dummy_hash() -> Result<(), AuthError> {
    tokio::task::spawn_blocking(|| lazy_static::initialize(&DUMMY_HASH))
        .await
        .map_err(|e| AuthError::Internal(e.into()))
}

/// Verifies on the blocking pool. `None` runs against a dummy hash and
/// always yields `false`.
pub async fn verify_password_blocking(
    plain: String,
    hash: Option<String>,
) -> Result<bool, AuthError> {
    let known = hash.is_some();
    let ok = tokio::task::spawn_blocking(move || match hash {
        Some(h) => verify_password(&plain, &h),
        None => verify_password(&plain, &DUMMY_HASH).or(Ok(false)),
    })
    .await
    .map_err(|e| AuthError::Internal(e.into()))??;
    Ok(known && ok)
}
