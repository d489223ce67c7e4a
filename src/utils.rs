use actix_web::http::header::LOCATION;
use actix_web::HttpResponse;

/// 303, so that the browser follows up with a `GET` even after a `POST`
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, location))
        .finish()
}

/// Redirect back to a dashboard page, with a success or error popup
pub fn redirect_with_popup(
    location: &str,
    success: bool,
) -> HttpResponse {
    let show = match success {
        true => "success",
        false => "error",
    };
    redirect(&format!("{location}?show={show}"))
}
