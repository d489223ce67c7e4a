use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;
use serde::Deserialize;

use super::error_chain_fmt;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::email_client::EmailError;
use crate::newsletter_state::ActiveNewsletter;
use crate::store::Query;
use crate::store::Store;
use crate::templates::branding;
use crate::templates::error_page;
use crate::templates::page;
use crate::templates::success_page;

#[derive(thiserror::Error)]
pub enum UnsubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("We couldn't find a subscription for this email address.")]
    NotSubscribed,
    #[error("We could not send you a confirmation email. Please try again later.")]
    SendError(#[source] EmailError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for UnsubscribeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UnsubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotSubscribed => StatusCode::NOT_FOUND,
            Self::SendError(_) | Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_page(self.status_code(), "Unsubscribe failed", &self.to_string())
    }
}

#[derive(Deserialize, Debug)]
pub struct UnsubscribeParams {
    key: Option<String>,
}

/// `GET /unsubscribe[?key=...]`
///
/// Without a key, the form asking for an email address. With a key (the link
/// from the confirmation email), the subscriber is deleted. Deleting an
/// unknown key succeeds, so following the link twice is harmless.
#[tracing::instrument(name = "Unsubscribing", skip(params, store, newsletter), fields(key = ?params.key))]
pub async fn unsubscribe(
    params: web::Query<UnsubscribeParams>,
    store: web::Data<Store>,
    newsletter: web::ReqData<ActiveNewsletter>,
) -> Result<HttpResponse, UnsubscribeError> {
    let Some(key) = &params.key else {
        return Ok(page(
            StatusCode::OK,
            "unsubscribe.html",
            &branding(&newsletter.config),
        ));
    };

    store
        .subscribers
        .delete(key)
        .await
        .context("Failed to delete subscriber")?;

    Ok(success_page(
        "Unsubscribed",
        "You will no longer receive emails from us. Sorry to see you go!",
    ))
}

#[derive(Deserialize)]
pub struct UnsubscribeForm {
    email: String,
}

/// `POST /unsubscribe/send`
///
/// Mails a confirmation link to the subscriber; nothing is deleted yet.
#[tracing::instrument(
    name = "Requesting unsubscribe confirmation",
    skip(form, store, newsletter),
    fields(subscriber_email = %form.email)
)]
pub async fn send_unsubscribe_confirmation(
    form: web::Form<UnsubscribeForm>,
    store: web::Data<Store>,
    newsletter: web::ReqData<ActiveNewsletter>,
) -> Result<HttpResponse, UnsubscribeError> {
    let email = SubscriberEmail::parse(form.0.email).map_err(UnsubscribeError::ValidationError)?;

    let record = store
        .subscribers
        .find::<Subscriber>(Query::all().eq("email", email.as_ref()))
        .await
        .context("Failed to look up subscriber")?
        .ok_or(UnsubscribeError::NotSubscribed)?;

    newsletter
        .email_client
        .send_unsubscribe_confirmation(&email, &record.key)
        .await
        .map_err(UnsubscribeError::SendError)?;

    Ok(success_page(
        "Check your inbox",
        "We sent you an email. Click the link in it to unsubscribe.",
    ))
}
