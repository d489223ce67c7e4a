use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;

use super::error_chain_fmt;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::email_client::EmailError;
use crate::newsletter_state::ActiveNewsletter;
use crate::store::Query;
use crate::store::Store;
use crate::templates::error_page;
use crate::templates::success_page;

#[derive(Deserialize)]
pub struct FormData {
    email: String,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("This email address is already subscribed.")]
    AlreadySubscribed,
    #[error("We could not send you a verification email. Please try again later.")]
    SendError(#[source] EmailError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for SubscribeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AlreadySubscribed => StatusCode::CONFLICT,
            Self::SendError(_) | Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_page(self.status_code(), "Subscription failed", &self.to_string())
    }
}

/// `POST /subscribe`
///
/// Creates an unverified subscriber and mails them a link keyed by the new
/// record's key. If the mail can't be sent, the record stays behind; the user
/// sees a send failure (and "already subscribed" if they try again).
///
/// ```sh
///     curl -v --data 'email=john@foo.com' http://127.0.0.1:8000/subscribe
/// ```
#[tracing::instrument(
    name = "Adding new subscriber",
    skip(form, store, newsletter),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe(
    form: web::Form<FormData>,
    store: web::Data<Store>,
    newsletter: web::ReqData<ActiveNewsletter>,
) -> Result<HttpResponse, SubscribeError> {
    let email = SubscriberEmail::parse(form.0.email).map_err(SubscribeError::ValidationError)?;

    // check-then-insert is not atomic; two concurrent requests can both get
    // through
    let existing = store
        .subscribers
        .find::<Subscriber>(Query::all().eq("email", email.as_ref()))
        .await
        .context("Failed to look up existing subscriber")?;
    if existing.is_some() {
        return Err(SubscribeError::AlreadySubscribed);
    }

    let subscriber = Subscriber::new(&email, Utc::now().date_naive());
    let key = store
        .subscribers
        .insert(&subscriber)
        .await
        .context("Failed to store new subscriber")?;

    newsletter
        .email_client
        .send_verification(&email, &key)
        .await
        .map_err(SubscribeError::SendError)?;

    Ok(success_page(
        "Almost there!",
        "We sent you an email. Click the link in it to confirm your subscription.",
    ))
}
