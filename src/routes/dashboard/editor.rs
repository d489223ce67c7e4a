use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;

use crate::domain::format_date;
use crate::domain::Post;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::email_client::EmailError;
use crate::newsletter_state::ActiveNewsletter;
use crate::routes::error_chain_fmt;
use crate::store::Query;
use crate::store::Store;
use crate::templates::branding;
use crate::templates::error_page;
use crate::templates::page;
use crate::utils::redirect_with_popup;

/// `GET /dashboard/editor`
pub async fn editor_form(newsletter: web::ReqData<ActiveNewsletter>) -> HttpResponse {
    let mut context = branding(&newsletter.config);
    context.insert("popup", "");
    page(StatusCode::OK, "editor.html", &context)
}

/// Both fields are optional so that a missing field ends up as a validation
/// error page rather than a bare 400
#[derive(Deserialize)]
pub struct PostForm {
    title: Option<String>,
    content: Option<String>,
}

#[derive(thiserror::Error)]
pub enum PublishError {
    #[error("{0}")]
    ValidationError(String),
    #[error("The post could not be sent, so it was not saved. Please try again.")]
    SendError(#[source] EmailError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for PublishError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PublishError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::SendError(_) | Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_page(self.status_code(), "Publishing failed", &self.to_string())
    }
}

/// Verified subscribers only. Records whose address no longer parses are
/// skipped, not fatal.
#[tracing::instrument(name = "Getting verified subscribers", skip(store))]
async fn get_verified_subscribers(store: &Store) -> Result<Vec<SubscriberEmail>, anyhow::Error> {
    let subscribers = store
        .subscribers
        .fetch::<Subscriber>(Query::all().eq("verified", true))
        .await
        .context("Failed to fetch verified subscribers")?
        .into_iter()
        .filter_map(|r| match SubscriberEmail::parse(r.value.email) {
            Ok(email) => Some(email),
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, key = %r.key, "skipping invalid email");
                None
            }
        })
        .collect();
    Ok(subscribers)
}

/// `POST /dashboard/editor/create`
///
/// The post is mailed out first and only saved once every verified
/// subscriber has been sent a copy. If sending fails partway, nothing is
/// saved, and resubmitting sends the post again to everyone (including those
/// who already got it).
#[tracing::instrument(name = "Publishing post", skip(form, store, newsletter), fields(title = ?form.title))]
pub async fn create_post(
    form: web::Form<PostForm>,
    store: web::Data<Store>,
    newsletter: web::ReqData<ActiveNewsletter>,
) -> Result<HttpResponse, PublishError> {
    let PostForm { title, content } = form.into_inner();
    let post = Post::parse(title, content, format_date(Utc::now().date_naive()))
        .map_err(PublishError::ValidationError)?;

    let recipients = get_verified_subscribers(&store).await?;
    newsletter
        .email_client
        .broadcast(&recipients, &post)
        .await
        .map_err(PublishError::SendError)?;

    store
        .posts
        .insert(&post)
        .await
        .context("Post was sent, but could not be saved")?;

    Ok(redirect_with_popup("/dashboard/home", true))
}
