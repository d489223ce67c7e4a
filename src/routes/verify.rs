use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;

use super::error_chain_fmt;
use crate::domain::Subscriber;
use crate::domain::Verification;
use crate::store::Store;
use crate::templates::error_page;
use crate::templates::success_page;

#[derive(thiserror::Error)]
pub enum VerifyError {
    #[error("This verification link is not valid. Maybe you unsubscribed in the meantime?")]
    UnknownToken,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for VerifyError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for VerifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownToken => StatusCode::NOT_FOUND,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_page(self.status_code(), "Verification failed", &self.to_string())
    }
}

/// `GET /verify/{token}`
///
/// The token is the subscriber's store key. Following the link a second time
/// is harmless.
#[tracing::instrument(name = "Verifying subscriber", skip(token, store), fields(token = %token))]
pub async fn verify(
    token: web::Path<String>,
    store: web::Data<Store>,
) -> Result<HttpResponse, VerifyError> {
    let record = store
        .subscribers
        .get::<Subscriber>(&token)
        .await
        .context("Failed to look up subscriber")?
        .ok_or(VerifyError::UnknownToken)?;

    match record.value.verify() {
        Verification::AlreadyVerified => Ok(success_page(
            "Already verified",
            "Your email address has already been verified. Nothing left to do!",
        )),
        Verification::Verified(subscriber) => {
            store
                .subscribers
                .update(&record.key, &subscriber)
                .await
                .context("Failed to mark subscriber as verified")?;
            Ok(success_page(
                "Subscription confirmed",
                "Thanks for verifying your email address. You will receive our next post.",
            ))
        }
    }
}
