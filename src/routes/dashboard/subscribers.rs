use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use anyhow::Context;
use chrono::Utc;

use super::DashboardError;
use super::PopupParams;
use crate::domain::Subscriber;
use crate::html::subscriber_table;
use crate::newsletter_state::ActiveNewsletter;
use crate::store::Query;
use crate::store::Store;
use crate::templates::branding;
use crate::templates::page;
use crate::utils::redirect_with_popup;

/// `GET /dashboard/subscribers[?show=success|error]`
#[tracing::instrument(name = "Listing subscribers", skip_all)]
pub async fn dashboard_subscribers(
    params: web::Query<PopupParams>,
    store: web::Data<Store>,
    newsletter: web::ReqData<ActiveNewsletter>,
) -> Result<HttpResponse, DashboardError> {
    let subscribers = store
        .subscribers
        .fetch::<Subscriber>(Query::all())
        .await
        .context("Failed to fetch subscribers")?;
    let table = subscriber_table(&subscribers, Utc::now().date_naive());

    let mut context = branding(&newsletter.config);
    context.insert("subscribers", &table.html);
    context.insert("total_subscribers", &table.total);
    context.insert("monthly_subscribers", &table.this_month);
    context.insert("popup", params.popup());
    Ok(page(StatusCode::OK, "subscribers.html", &context))
}

/// `GET /dashboard/subscribers/delete/{key}`
#[tracing::instrument(name = "Deleting subscriber", skip(store))]
pub async fn delete_subscriber(
    key: web::Path<String>,
    store: web::Data<Store>,
) -> HttpResponse {
    let result = store.subscribers.delete(&key).await;
    if let Err(e) = &result {
        tracing::error!(error.cause_chain = ?e, "failed to delete subscriber");
    }
    redirect_with_popup("/dashboard/subscribers", result.is_ok())
}
