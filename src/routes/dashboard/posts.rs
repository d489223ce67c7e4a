use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use anyhow::Context;

use super::DashboardError;
use super::PopupParams;
use crate::domain::Post;
use crate::html::post_list;
use crate::newsletter_state::ActiveNewsletter;
use crate::store::Query;
use crate::store::Store;
use crate::templates::branding;
use crate::templates::page;
use crate::utils::redirect_with_popup;

/// `GET /dashboard/home[?show=success|error]`
#[tracing::instrument(name = "Listing posts", skip_all)]
pub async fn dashboard_home(
    params: web::Query<PopupParams>,
    store: web::Data<Store>,
    newsletter: web::ReqData<ActiveNewsletter>,
) -> Result<HttpResponse, DashboardError> {
    let posts = store
        .posts
        .fetch::<Post>(Query::all())
        .await
        .context("Failed to fetch posts")?;

    let mut context = branding(&newsletter.config);
    context.insert("posts", &post_list(&posts));
    context.insert("popup", params.popup());
    Ok(page(StatusCode::OK, "dashboard.html", &context))
}

/// `GET /dashboard/home/delete/{key}`
///
/// Only removes the post from the dashboard; it has already been mailed out.
#[tracing::instrument(name = "Deleting post", skip(store))]
pub async fn delete_post(
    key: web::Path<String>,
    store: web::Data<Store>,
) -> HttpResponse {
    let result = store.posts.delete(&key).await;
    if let Err(e) = &result {
        tracing::error!(error.cause_chain = ?e, "failed to delete post");
    }
    redirect_with_popup("/dashboard/home", result.is_ok())
}
