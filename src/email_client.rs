use std::path::PathBuf;
use std::time::Duration;

use lettre::address::AddressError;
use lettre::message::Mailbox;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::Address;
use lettre::AsyncFileTransport;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;
use secrecy::ExposeSecret;
use tera::Context;

use crate::domain::NewsletterConfig;
use crate::domain::Post;
use crate::domain::SmtpCredentials;
use crate::domain::SubscriberEmail;
use crate::templates;

/// Port on which the SMTP server expects TLS from the first byte; every other
/// port is assumed to speak STARTTLS
const IMPLICIT_TLS_PORT: u16 = 465;

/// Server-side settings that don't come from the setup wizard
#[derive(Clone, Debug)]
pub struct EmailClientSettings {
    /// Public address of the server, for links in emails
    pub base_url: String,
    pub timeout: Duration,
    /// Write `.eml` files here instead of talking to the SMTP server
    pub outbox_dir: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum EmailError {
    #[error("{0:?} is not a valid email address")]
    InvalidAddress(String, #[source] AddressError),
    #[error("Failed to build email")]
    Build(#[from] lettre::error::Error),
    #[error("Failed to render email template")]
    Template(#[from] tera::Error),
    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Failed to write email to outbox")]
    Outbox(#[from] lettre::transport::file::Error),
    #[error("Failed to create outbox directory")]
    OutboxDir(#[source] std::io::Error),
    #[error("SMTP server did not respond")]
    NoResponse,
}

#[derive(Debug)]
enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Outbox(AsyncFileTransport<Tokio1Executor>),
}

/// Sends the three kinds of email the newsletter knows about. Built from the
/// config record, since that is where the SMTP credentials and branding live.
///
/// Like `reqwest::Client`, the SMTP transport keeps a connection pool, so one
/// instance should be shared across requests.
#[derive(Debug)]
pub struct EmailClient {
    transport: Transport,
    sender: Mailbox,
    base_url: String,
    /// Branding shared by every template
    context: Context,
}

fn smtp_transport(
    creds: &SmtpCredentials,
    timeout: Duration,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
    let builder = match creds.port {
        IMPLICIT_TLS_PORT => AsyncSmtpTransport::<Tokio1Executor>::relay(&creds.server)?,
        _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&creds.server)?,
    };
    Ok(builder
        .port(creds.port)
        .credentials(Credentials::new(
            creds.username.clone(),
            creds.password.expose_secret().clone(),
        ))
        .timeout(Some(timeout))
        .build())
}

/// Connect and log in to the SMTP server, then hang up. Used by the setup
/// wizard before any config exists.
#[tracing::instrument(name = "Testing SMTP credentials", skip(creds), fields(server = %creds.server, port = creds.port))]
pub async fn test_credentials(
    creds: &SmtpCredentials,
    timeout: Duration,
) -> Result<(), EmailError> {
    match smtp_transport(creds, timeout)?.test_connection().await? {
        true => Ok(()),
        false => Err(EmailError::NoResponse),
    }
}

pub fn parse_address(address: &str) -> Result<Address, EmailError> {
    address
        .parse()
        .map_err(|e| EmailError::InvalidAddress(address.to_owned(), e))
}

impl EmailClient {
    /// The SMTP username doubles as the sender address
    pub fn new(
        settings: &EmailClientSettings,
        config: &NewsletterConfig,
    ) -> Result<Self, EmailError> {
        let sender = Mailbox::new(
            Some(config.title.clone()),
            parse_address(&config.smtp_username)?,
        );

        let transport = match &settings.outbox_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(EmailError::OutboxDir)?;
                Transport::Outbox(AsyncFileTransport::new(dir))
            }
            None => Transport::Smtp(smtp_transport(
                &config.smtp_credentials(),
                settings.timeout,
            )?),
        };

        Ok(Self {
            transport,
            sender,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            context: templates::branding(config),
        })
    }

    pub fn sender(&self) -> &Mailbox { &self.sender }

    async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(Mailbox::new(None, parse_address(recipient.as_ref())?))
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text_content.to_owned(),
                html_content.to_owned(),
            ))?;

        match &self.transport {
            Transport::Smtp(t) => {
                t.send(message).await?;
            }
            Transport::Outbox(t) => {
                t.send(message).await?;
            }
        }
        Ok(())
    }

    /// Render `{template}.html` and `{template}.txt` with the branding plus
    /// `extra`
    fn render(
        &self,
        template: &str,
        extra: Context,
    ) -> Result<(String, String), EmailError> {
        let mut context = self.context.clone();
        context.extend(extra);
        let html = templates::render(&format!("email/{template}.html"), &context)?;
        let text = templates::render(&format!("email/{template}.txt"), &context)?;
        Ok((html, text))
    }

    /// The link is keyed by the subscriber's store key
    #[tracing::instrument(name = "Sending verification email", skip(self, token))]
    pub async fn send_verification(
        &self,
        recipient: &SubscriberEmail,
        token: &str,
    ) -> Result<(), EmailError> {
        let mut extra = Context::new();
        extra.insert("link", &format!("{}/verify/{token}", self.base_url));
        let (html, text) = self.render("verify", extra)?;
        let subject = format!(
            "Confirm your subscription to {}",
            self.sender.name.as_deref().unwrap_or("our newsletter")
        );
        self.send_email(recipient, &subject, &html, &text).await
    }

    #[tracing::instrument(name = "Sending unsubscribe confirmation email", skip(self, token))]
    pub async fn send_unsubscribe_confirmation(
        &self,
        recipient: &SubscriberEmail,
        token: &str,
    ) -> Result<(), EmailError> {
        let mut extra = Context::new();
        extra.insert("link", &format!("{}/unsubscribe?key={token}", self.base_url));
        let (html, text) = self.render("unsubscribe", extra)?;
        self.send_email(
            recipient,
            "Confirm that you want to unsubscribe",
            &html,
            &text,
        )
        .await
    }

    /// One message per recipient, so that addresses are never disclosed to
    /// each other. The first failure aborts the loop; recipients before it
    /// have already received the post.
    #[tracing::instrument(
        name = "Broadcasting post",
        skip(self, recipients, post),
        fields(title = %post.title, recipients = recipients.len())
    )]
    pub async fn broadcast(
        &self,
        recipients: &[SubscriberEmail],
        post: &Post,
    ) -> Result<(), EmailError> {
        let mut extra = Context::new();
        extra.insert("post_title", &post.title);
        extra.insert("post_date", &post.date);
        extra.insert("post_content", &post.html_content);
        extra.insert("post_text", &post.text_content);
        extra.insert("unsubscribe_link", &format!("{}/unsubscribe", self.base_url));
        let (html, text) = self.render("post", extra)?;

        for recipient in recipients {
            self.send_email(recipient, &post.title, &html, &text)
                .await
                .inspect_err(|e| {
                    tracing::error!(
                        error.cause_chain = ?e,
                        "failed to deliver post to {recipient}"
                    )
                })?;
        }
        Ok(())
    }
}
