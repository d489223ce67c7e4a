use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use tera::Context;
use tera::Tera;

use crate::domain::NewsletterConfig;

/// All templates are compiled into the binary, so a missing or broken template
/// is caught by the first test that renders anything.
///
/// Templates ending in `.html` are autoescaped; pre-rendered fragments must be
/// passed through the `safe` filter.
static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../templates/base.html")),
        ("index.html", include_str!("../templates/index.html")),
        ("success.html", include_str!("../templates/success.html")),
        ("error.html", include_str!("../templates/error.html")),
        ("errcode.html", include_str!("../templates/errcode.html")),
        ("unsubscribe.html", include_str!("../templates/unsubscribe.html")),
        ("setup.html", include_str!("../templates/setup.html")),
        ("dashboard_base.html", include_str!("../templates/dashboard_base.html")),
        ("dashboard.html", include_str!("../templates/dashboard.html")),
        ("editor.html", include_str!("../templates/editor.html")),
        ("subscribers.html", include_str!("../templates/subscribers.html")),
        ("email/verify.html", include_str!("../templates/email/verify.html")),
        ("email/verify.txt", include_str!("../templates/email/verify.txt")),
        ("email/unsubscribe.html", include_str!("../templates/email/unsubscribe.html")),
        ("email/unsubscribe.txt", include_str!("../templates/email/unsubscribe.txt")),
        ("email/post.html", include_str!("../templates/email/post.html")),
        ("email/post.txt", include_str!("../templates/email/post.txt")),
    ])
    .expect("embedded templates must parse");
    tera
});

pub fn render(
    name: &str,
    context: &Context,
) -> Result<String, tera::Error> {
    TEMPLATES.render(name, context)
}

/// Title, colours and privacy footer, shared by every page and email once the
/// newsletter is set up
pub fn branding(config: &NewsletterConfig) -> Context {
    let mut context = Context::new();
    context.insert("newsletter_title", &config.title);
    context.insert("newsletter_tagline", &config.tagline);
    context.insert("newsletter_description", &config.description);
    context.insert("color_fade1", &config.color_fade1);
    context.insert("color_fade2", &config.color_fade2);
    context.insert("color_title", &config.color_title);
    context.insert("privacy_name", &config.privacy_name);
    context.insert("privacy_link", &config.privacy_link);
    context.insert("privacy_address", &config.privacy_address);
    context
}

/// Render `name` into an HTML response. A render failure is logged and
/// degrades to a bare 500, since there is no template left to fall back on.
pub fn page(
    status: StatusCode,
    name: &str,
    context: &Context,
) -> HttpResponse {
    match render(name, context) {
        Ok(body) => HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(body),
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "failed to render {name}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn result_context(
    title: &str,
    description: &str,
) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("description", description);
    context
}

/// Generic "it worked" page
pub fn success_page(
    title: &str,
    description: &str,
) -> HttpResponse {
    page(
        StatusCode::OK,
        "success.html",
        &result_context(title, description),
    )
}

/// Generic "it didn't work" page
pub fn error_page(
    status: StatusCode,
    title: &str,
    description: &str,
) -> HttpResponse {
    page(status, "error.html", &result_context(title, description))
}

pub fn not_found_page() -> HttpResponse {
    let mut context = Context::new();
    context.insert("error_code", "404");
    context.insert(
        "error_description",
        "The requested resource couldn't be found.",
    );
    page(StatusCode::NOT_FOUND, "errcode.html", &context)
}
