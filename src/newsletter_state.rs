use std::ops::Deref;
use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpMessage;
use actix_web_lab::middleware::Next;
use anyhow::Context;
use tokio::sync::Mutex;
use tokio::sync::RwLock;

use crate::domain::NewsletterConfig;
use crate::email_client::EmailClient;
use crate::email_client::EmailClientSettings;
use crate::store::Base;
use crate::store::Query;
use crate::templates::error_page;
use crate::templates::not_found_page;
use crate::utils::redirect;

/// Everything that only exists once setup is complete
#[derive(Debug)]
pub struct Newsletter {
    pub config: NewsletterConfig,
    pub email_client: EmailClient,
}

impl Newsletter {
    pub fn new(
        settings: &EmailClientSettings,
        config: NewsletterConfig,
    ) -> Result<Self, anyhow::Error> {
        let email_client =
            EmailClient::new(settings, &config).context("Failed to build email client")?;
        Ok(Self {
            config,
            email_client,
        })
    }
}

/// The newsletter a request is being served for, inserted into request
/// extensions by `require_setup`. Handlers take it as `web::ReqData<ActiveNewsletter>`.
#[derive(Clone)]
pub struct ActiveNewsletter(Arc<Newsletter>);

impl Deref for ActiveNewsletter {
    type Target = Newsletter;
    fn deref(&self) -> &Self::Target { &self.0 }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SetupOutcome {
    Completed,
    /// A config record already existed; nothing was written
    AlreadyDone,
}

/// Process-wide view of the config record. Once a config has been seen it is
/// cached for good, since nothing ever deletes or edits it.
pub struct NewsletterState {
    config_base: Base,
    email_settings: EmailClientSettings,
    cached: RwLock<Option<Arc<Newsletter>>>,
    // serialises the check-then-insert in `complete`
    setup_lock: Mutex<()>,
}

impl NewsletterState {
    pub fn new(
        config_base: Base,
        email_settings: EmailClientSettings,
    ) -> Self {
        Self {
            config_base,
            email_settings,
            cached: RwLock::new(None),
            setup_lock: Mutex::new(()),
        }
    }

    pub fn email_settings(&self) -> &EmailClientSettings { &self.email_settings }

    /// `None` until setup has been completed. The store is only queried while
    /// nothing is cached.
    #[tracing::instrument(name = "Loading newsletter config", skip(self))]
    pub async fn current(&self) -> Result<Option<Arc<Newsletter>>, anyhow::Error> {
        if let Some(newsletter) = self.cached.read().await.as_ref() {
            return Ok(Some(Arc::clone(newsletter)));
        }

        let Some(record) = self
            .config_base
            .find::<NewsletterConfig>(Query::all())
            .await
            .context("Failed to query config")?
        else {
            return Ok(None);
        };

        let newsletter = Arc::new(Newsletter::new(&self.email_settings, record.value)?);
        *self.cached.write().await = Some(Arc::clone(&newsletter));
        Ok(Some(newsletter))
    }

    /// Write the one and only config record, unless one exists already
    #[tracing::instrument(name = "Completing setup", skip(self, config), fields(title = %config.title))]
    pub async fn complete(
        &self,
        config: NewsletterConfig,
    ) -> Result<SetupOutcome, anyhow::Error> {
        let _guard = self.setup_lock.lock().await;

        if self.current().await?.is_some() {
            return Ok(SetupOutcome::AlreadyDone);
        }

        // build the client first, so that a config we can't send mail with is
        // never persisted
        let newsletter = Arc::new(Newsletter::new(&self.email_settings, config)?);
        self.config_base
            .insert(&newsletter.config)
            .await
            .context("Failed to store config")?;

        *self.cached.write().await = Some(newsletter);
        Ok(SetupOutcome::Completed)
    }
}

fn state(req: &ServiceRequest) -> Result<web::Data<NewsletterState>, actix_web::Error> {
    req.app_data::<web::Data<NewsletterState>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("NewsletterState not registered"))
}

fn unexpected(e: anyhow::Error) -> actix_web::Error {
    let resp = error_page(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong",
        &e.to_string(),
    );
    InternalError::from_response(e, resp).into()
}

/// Redirect to `/setup` until a config exists; afterwards, make the newsletter
/// available to handlers.
pub async fn require_setup(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    match state(&req)?.current().await {
        Ok(Some(newsletter)) => {
            req.extensions_mut().insert(ActiveNewsletter(newsletter));
            next.call(req).await
        }
        Ok(None) => {
            let err = anyhow::anyhow!("The newsletter has not been set up yet.");
            Err(InternalError::from_response(err, redirect("/setup")).into())
        }
        Err(e) => Err(unexpected(e)),
    }
}

/// The setup pages disappear once a config exists
pub async fn reject_after_setup(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    match state(&req)?.current().await {
        Ok(None) => next.call(req).await,
        Ok(Some(_)) => {
            let err = anyhow::anyhow!("Setup has already been completed.");
            Err(InternalError::from_response(err, not_found_page()).into())
        }
        Err(e) => Err(unexpected(e)),
    }
}
