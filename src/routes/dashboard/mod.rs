mod editor;
mod posts;
mod subscribers;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
pub use editor::*;
pub use posts::*;
use serde::Deserialize;
pub use subscribers::*;

use super::error_chain_fmt;
use crate::templates::error_page;
use crate::utils::redirect;

/// `?show=success|error`, set by the redirects after a delete or publish
#[derive(Deserialize)]
pub struct PopupParams {
    show: Option<String>,
}

impl PopupParams {
    fn popup(&self) -> &'static str { crate::html::popup(self.show.as_deref()) }
}

/// `GET /dashboard`
pub async fn dashboard() -> HttpResponse { redirect("/dashboard/home") }

/// Errors while rendering a dashboard page; failed actions are reported with
/// a popup instead
#[derive(thiserror::Error)]
#[error(transparent)]
pub struct DashboardError(#[from] anyhow::Error);

impl std::fmt::Debug for DashboardError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl actix_web::ResponseError for DashboardError {
    fn status_code(&self) -> StatusCode { StatusCode::INTERNAL_SERVER_ERROR }

    fn error_response(&self) -> HttpResponse {
        error_page(
            self.status_code(),
            "Something went wrong",
            &self.to_string(),
        )
    }
}
