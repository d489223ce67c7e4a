use actix_web::http::header::HeaderValue;
use actix_web::http::header::CACHE_CONTROL;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use chrono::Datelike;
use chrono::Utc;

use crate::newsletter_state::ActiveNewsletter;
use crate::templates::branding;
use crate::templates::page;

/// `GET /`
///
/// The subscribe form. Never cached, since before setup the same URL
/// redirects to `/setup`.
pub async fn home(newsletter: web::ReqData<ActiveNewsletter>) -> HttpResponse {
    let mut context = branding(&newsletter.config);
    context.insert("footer_year", &Utc::now().year());

    let mut resp = page(StatusCode::OK, "index.html", &context);
    resp.headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    resp
}
