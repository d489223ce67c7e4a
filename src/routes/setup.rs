use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use secrecy::Secret;
use serde::Deserialize;
use tera::Context;

use super::error_chain_fmt;
use crate::domain::NewsletterConfig;
use crate::domain::SmtpCredentials;
use crate::email_client::parse_address;
use crate::email_client::test_credentials;
use crate::email_client::EmailError;
use crate::newsletter_state::NewsletterState;
use crate::newsletter_state::SetupOutcome;
use crate::templates::error_page;
use crate::templates::not_found_page;
use crate::templates::page;
use crate::templates::success_page;
use crate::utils::redirect;

#[derive(thiserror::Error)]
pub enum SetupError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Could not log in to the SMTP server: {0}")]
    SmtpError(#[source] EmailError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for SetupError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SetupError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::SmtpError(_) | Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_page(self.status_code(), "Setup failed", &self.to_string())
    }
}

/// `GET /setup`
pub async fn setup_form() -> HttpResponse { page(StatusCode::OK, "setup.html", &Context::new()) }

/// The SMTP half of the setup form. The test button submits the whole form
/// (as a `GET`), so the other fields come along and are ignored.
#[derive(Deserialize)]
pub struct SmtpForm {
    username: String,
    password: Secret<String>,
    server: String,
    port: u16,
}

impl From<SmtpForm> for SmtpCredentials {
    fn from(form: SmtpForm) -> Self {
        Self {
            username: form.username,
            password: form.password,
            server: form.server,
            port: form.port,
        }
    }
}

/// `GET /setup/test?username=..&password=..&server=..&port=..`
///
/// Logs in to the SMTP server without sending anything. Talks to the real
/// server even when mail is being written to an outbox.
#[tracing::instrument(
    name = "Testing SMTP settings",
    skip(query, state),
    fields(server = %query.server, port = query.port)
)]
pub async fn setup_test(
    query: web::Query<SmtpForm>,
    state: web::Data<NewsletterState>,
) -> Result<HttpResponse, SetupError> {
    let creds: SmtpCredentials = query.into_inner().into();
    test_credentials(&creds, state.email_settings().timeout)
        .await
        .map_err(SetupError::SmtpError)?;
    Ok(success_page(
        "It works!",
        &format!(
            "Logged in to {}:{} as {}.",
            creds.server, creds.port, creds.username
        ),
    ))
}

/// Field names as sent by the setup page
#[derive(Deserialize)]
pub struct SetupForm {
    username: String,
    password: Secret<String>,
    server: String,
    port: u16,
    title: String,
    tagline: String,
    description: String,
    fade1: String,
    fade2: String,
    titletext: String,
    name: String,
    privacy: String,
    address: String,
}

impl TryFrom<SetupForm> for NewsletterConfig {
    type Error = String;

    fn try_from(form: SetupForm) -> Result<Self, Self::Error> {
        // the username is also the sender address
        parse_address(&form.username).map_err(|e| e.to_string())?;

        for (field, value) in [
            ("server", &form.server),
            ("title", &form.title),
        ] {
            if value.trim().is_empty() {
                return Err(format!("The {field} field must not be empty."));
            }
        }

        Ok(Self {
            smtp_username: form.username,
            smtp_password: form.password,
            smtp_server: form.server,
            smtp_port: form.port,
            title: form.title,
            tagline: form.tagline,
            description: form.description,
            color_fade1: form.fade1,
            color_fade2: form.fade2,
            color_title: form.titletext,
            privacy_name: form.name,
            privacy_link: form.privacy,
            privacy_address: form.address,
        })
    }
}

/// `POST /setup/complete`
///
/// Writes the config record, which ends setup for good. Testing the SMTP
/// settings first is up to the user.
#[tracing::instrument(name = "Completing setup", skip(form, state), fields(title = %form.title))]
pub async fn setup_complete(
    form: web::Form<SetupForm>,
    state: web::Data<NewsletterState>,
) -> Result<HttpResponse, SetupError> {
    let config: NewsletterConfig = form.0.try_into().map_err(SetupError::ValidationError)?;

    match state.complete(config).await? {
        SetupOutcome::Completed => Ok(redirect("/dashboard/home")),
        // lost a race with another request that got past the gate
        SetupOutcome::AlreadyDone => Ok(not_found_page()),
    }
}
