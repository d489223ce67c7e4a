use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;

/// The single record in the `config` collection, written once by
/// `/setup/complete`. Its existence is what marks the newsletter as set up.
///
/// Field names on the wire (including the `smpt-` spelling) are kept as-is so
/// that bases created by earlier deployments still deserialize.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewsletterConfig {
    #[serde(rename = "smpt-username")]
    pub smtp_username: String,
    #[serde(rename = "smtp-password", serialize_with = "expose")]
    pub smtp_password: Secret<String>,
    #[serde(rename = "smpt-server")]
    pub smtp_server: String,
    #[serde(rename = "smtp-port")]
    pub smtp_port: u16,

    #[serde(rename = "newsletter-title")]
    pub title: String,
    #[serde(rename = "newsletter-tagline")]
    pub tagline: String,
    #[serde(rename = "newsletter-description")]
    pub description: String,

    /// Background gradient start
    #[serde(rename = "color-fade1")]
    pub color_fade1: String,
    /// Background gradient end
    #[serde(rename = "color-fade2")]
    pub color_fade2: String,
    #[serde(rename = "color-title")]
    pub color_title: String,

    /// Name of the person/entity responsible for the newsletter
    #[serde(rename = "privacy-name")]
    pub privacy_name: String,
    /// Link to the privacy policy
    #[serde(rename = "privacy-link")]
    pub privacy_link: String,
    /// Postal address for the legal footer
    #[serde(rename = "privacy-address")]
    pub privacy_address: String,
}

/// SMTP login, as entered on the setup page
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: Secret<String>,
    pub server: String,
    pub port: u16,
}

impl NewsletterConfig {
    pub fn smtp_credentials(&self) -> SmtpCredentials {
        SmtpCredentials {
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            server: self.smtp_server.clone(),
            port: self.smtp_port,
        }
    }
}

// the password has to reach the store in clear text; `Secret` only keeps it
// out of logs
fn expose<S: Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
