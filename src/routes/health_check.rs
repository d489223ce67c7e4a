use actix_web::HttpResponse;

/// `GET /health_check`
///
/// Not behind the setup gate, so that a fresh deployment passes its health
/// checks before anyone has visited `/setup`.
///
/// Note: viewing http response requires `curl -v`
pub async fn health_check() -> HttpResponse { HttpResponse::Ok().finish() }
