use actix_web::body::MessageBody;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::error::InternalError;
use actix_web::http::header;
use actix_web::http::header::HeaderValue;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web_lab::middleware::Next;

use super::basic_authentication;
use super::validate_credentials;
use super::Admin;
use super::AuthError;
use crate::templates::error_page;

fn unauthorized() -> HttpResponse {
    let mut resp = error_page(
        StatusCode::UNAUTHORIZED,
        "Unauthorized",
        "You must log in to access the dashboard.",
    );
    resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(r#"Basic realm="dashboard""#),
    );
    resp
}

/// Guards the dashboard scope. A no-op unless an admin account is configured;
/// otherwise the browser is asked for Basic credentials until they match.
pub async fn reject_unauthorized(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let admin = match req.app_data::<web::Data<Admin>>() {
        Some(admin) => admin.0.clone(),
        None => None,
    };
    let Some(admin) = admin else {
        return next.call(req).await;
    };

    let creds = match basic_authentication(req.headers()) {
        Ok(creds) => creds,
        Err(e) => return Err(InternalError::from_response(e, unauthorized()).into()),
    };

    match validate_credentials(creds, &admin).await {
        Ok(()) => next.call(req).await,
        Err(e @ AuthError::InvalidCredentials(_)) => {
            Err(InternalError::from_response(e, unauthorized()).into())
        }
        Err(e) => {
            let resp = error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                &e.to_string(),
            );
            Err(InternalError::from_response(e, resp).into())
        }
    }
}
