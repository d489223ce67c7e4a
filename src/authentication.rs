// the dashboard has exactly one user (the person who ran the setup wizard).
// when an admin is configured, every dashboard request carries HTTP Basic
// credentials (RFCs 2617, 7617), checked against an argon2 PHC string from the
// configuration

mod middleware;

use actix_web::http::header::HeaderMap;
use anyhow::Context;
use argon2::Argon2;
use argon2::PasswordHash;
use argon2::PasswordVerifier;
use base64::engine::general_purpose;
use base64::Engine;
pub use middleware::reject_unauthorized;
use secrecy::ExposeSecret;
use secrecy::Secret;
use tokio::task::JoinHandle;

use crate::configuration::AdminSettings;

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

/// Wrapper for the (optional) admin account, shared via `Data`. `None` leaves
/// the dashboard open.
pub struct Admin(pub Option<AdminSettings>);

/// Extract `username:password` from an `Authorization: Basic ...` header
pub fn basic_authentication(headers: &HeaderMap) -> Result<Credentials, anyhow::Error> {
    let encoded = headers
        .get("Authorization")
        .context("No Authorization header")?
        .to_str()
        .context("Invalid str")?
        .strip_prefix("Basic ")
        .context("Authorization scheme was not 'Basic'")?;

    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .context("Failed to decode base64")?;
    let decoded = String::from_utf8(decoded).context("Invalid str")?;

    // passwords may contain ':', usernames may not
    let (username, password) = decoded
        .split_once(':')
        .context("No password")?;

    Ok(Credentials {
        username: username.to_string(),
        password: Secret::new(password.to_string()),
    })
}

/// CPU-bound and slow (up to 0.5 s); must not run on the async executor
fn verify_password(
    supplied_password: Secret<String>,
    stored_password: Secret<String>,
) -> Result<(), AuthError> {
    let stored_password = &PasswordHash::new(stored_password.expose_secret())
        .context("Failed to read stored PHC string")
        .map_err(AuthError::UnexpectedError)?;
    Argon2::default()
        .verify_password(
            supplied_password.expose_secret().as_bytes(),
            stored_password,
        )
        .context("Invalid password")
        .map_err(AuthError::InvalidCredentials)?;
    Ok(())
}

/// Wrapper for `spawn_blocking` that keeps the caller's span
pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(f))
}

/// The hash is verified even when the username is wrong, so that both
/// failures take the same time and usernames can't be enumerated.
#[tracing::instrument(name = "Validating credentials", skip(creds, admin), fields(username = %creds.username))]
pub async fn validate_credentials(
    creds: Credentials,
    admin: &AdminSettings,
) -> Result<(), AuthError> {
    let username_ok = creds.username == admin.username;
    let stored_password = admin.password_hash.clone();

    spawn_blocking_with_tracing(move || verify_password(creds.password, stored_password))
        .await
        .context("Failed to spawn blocking thread")
        .map_err(AuthError::UnexpectedError)??;

    match username_ok {
        true => Ok(()),
        false => Err(AuthError::InvalidCredentials(anyhow::anyhow!(
            "Unknown username"
        ))),
    }
}
