use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use actix_web_lab::middleware::from_fn;
use tracing_actix_web::TracingLogger;

use crate::authentication::reject_unauthorized;
use crate::authentication::Admin;
use crate::configuration::AdminSettings;
use crate::configuration::Settings;
use crate::email_client::EmailClientSettings;
use crate::newsletter_state::reject_after_setup;
use crate::newsletter_state::require_setup;
use crate::newsletter_state::NewsletterState;
use crate::routes::create_post;
use crate::routes::dashboard;
use crate::routes::dashboard_home;
use crate::routes::dashboard_subscribers;
use crate::routes::delete_post;
use crate::routes::delete_subscriber;
use crate::routes::editor_form;
use crate::routes::health_check;
use crate::routes::home;
use crate::routes::not_found;
use crate::routes::send_unsubscribe_confirmation;
use crate::routes::setup_complete;
use crate::routes::setup_form;
use crate::routes::setup_test;
use crate::routes::subscribe;
use crate::routes::unsubscribe;
use crate::routes::verify;
use crate::store::Store;
use crate::templates::error_page;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Bind the listener, connect the store, and build the `Server`. Nothing
    /// runs until `run_until_stopped` is awaited.
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let store = cfg.store.store()?;
        Self::build_with_store(cfg, store).await
    }

    /// Like `build`, but with a store handle the caller keeps a clone of (the
    /// in-memory backend is only shared between clones)
    pub async fn build_with_store(
        cfg: Settings,
        store: Store,
    ) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;

        // port 0 lets the OS pick; tests need to know which one it picked
        let port = listener.local_addr()?.port();

        let email_settings = cfg
            .email_client
            .client_settings(&cfg.application.base_url);

        let server = run(
            listener,
            store,
            email_settings,
            cfg.application.admin,
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

/// Form and query strings that don't deserialize get the same error page as
/// any other validation failure
fn bad_request(err: impl std::fmt::Display + std::fmt::Debug + 'static) -> actix_web::Error {
    let resp = error_page(
        StatusCode::BAD_REQUEST,
        "Invalid input",
        &format!("Some fields are missing or invalid: {err}"),
    );
    InternalError::from_response(err, resp).into()
}

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all endpoints. Apart from `/health_check`, every route sits behind
/// the setup gate: `/setup*` only exists before setup, everything else only
/// after.
pub fn run(
    listener: TcpListener,
    store: Store,
    email_settings: EmailClientSettings,
    admin: Option<AdminSettings>,
) -> Result<Server, anyhow::Error> {
    let state = Data::new(NewsletterState::new(store.config.clone(), email_settings));
    let store = Data::new(store);
    let admin = Data::new(Admin(admin));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/setup")
                    .wrap(from_fn(reject_after_setup))
                    .route("", web::get().to(setup_form))
                    .route("/test", web::get().to(setup_test))
                    .route("/complete", web::post().to(setup_complete)),
            )
            // middlewares run in reverse order of registration: the setup gate
            // first, then authentication
            .service(
                web::scope("/dashboard")
                    .wrap(from_fn(reject_unauthorized))
                    .wrap(from_fn(require_setup))
                    .route("", web::get().to(dashboard))
                    .route("/home", web::get().to(dashboard_home))
                    .route("/home/delete/{key}", web::get().to(delete_post))
                    .route("/editor", web::get().to(editor_form))
                    .route("/editor/create", web::post().to(create_post))
                    .route("/subscribers", web::get().to(dashboard_subscribers))
                    .route(
                        "/subscribers/delete/{key}",
                        web::get().to(delete_subscriber),
                    ),
            )
            .service(
                web::scope("")
                    .wrap(from_fn(require_setup))
                    .route("/", web::get().to(home))
                    .route("/subscribe", web::post().to(subscribe))
                    .route("/verify/{token}", web::get().to(verify))
                    .route("/unsubscribe", web::get().to(unsubscribe))
                    .route(
                        "/unsubscribe/send",
                        web::post().to(send_unsubscribe_confirmation),
                    ),
            )
            .default_service(web::to(not_found))
            .app_data(web::FormConfig::default().error_handler(|err, _| bad_request(err)))
            .app_data(web::QueryConfig::default().error_handler(|err, _| bad_request(err)))
            .app_data(state.clone())
            .app_data(store.clone())
            .app_data(admin.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
