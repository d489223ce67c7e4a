use std::env;
use std::env::current_dir;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::email_client::EmailClientSettings;
use crate::store::Store;

/// Global configuration, loaded from the yaml files in `configuration/`. See
/// `get_configuration`.
///
/// Note that this only covers how the server runs. The newsletter itself
/// (SMTP credentials, title, theme) is configured through `/setup` and lives
/// in the store.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub store: StoreSettings,
    pub email_client: EmailSettings,
}

/// Server configuration
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    /// Should be localhost on dev machine, 0.0.0.0 on prod
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    /// Public address of the server, used to build the links in outgoing
    /// emails (verification, unsubscribe)
    pub base_url: String,

    /// When absent, `/dashboard` is reachable by anyone who can reach the
    /// server
    pub admin: Option<AdminSettings>,
}

/// Credentials for HTTP Basic authentication on `/dashboard`
#[derive(Deserialize, Clone)]
pub struct AdminSettings {
    pub username: String,
    /// PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`
    pub password_hash: Secret<String>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on restart
    Memory,
    Deta,
}

#[derive(Deserialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Names are `{prefix}-subscribers`, `{prefix}-posts`, `{prefix}-config`
    pub collection_prefix: String,
    pub deta: Option<DetaSettings>,
}

#[derive(Deserialize, Clone)]
pub struct DetaSettings {
    /// e.g. `https://database.deta.sh/v1`
    pub base_url: String,
    pub project_key: Secret<String>,
}

impl StoreSettings {
    pub fn store(&self) -> Result<Store, anyhow::Error> {
        match self.backend {
            StoreBackend::Memory => Ok(Store::in_memory(&self.collection_prefix)),
            StoreBackend::Deta => {
                let deta = self
                    .deta
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("store.deta must be set for the deta backend"))?;
                Store::deta(
                    &deta.base_url,
                    deta.project_key.clone(),
                    &self.collection_prefix,
                )
            }
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct EmailSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,

    /// If set, emails are written to this directory as `.eml` files instead
    /// of going out over SMTP
    pub outbox_dir: Option<PathBuf>,
}

impl EmailSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_milliseconds) }

    pub fn client_settings(
        &self,
        base_url: &str,
    ) -> EmailClientSettings {
        EmailClientSettings {
            base_url: base_url.to_owned(),
            timeout: self.timeout(),
            outbox_dir: self.outbox_dir.clone(),
        }
    }
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Display for Environment {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        )?;
        Ok(())
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            e => Err(format!("Invalid environment: {e}")),
        }
    }
}

/// Load yaml configuration files at `<project_root>/configuration`, then
/// apply `APP_`-prefixed env vars on top.
///
/// `APP_APPLICATION__PORT=5001` -> `Settings.application.port`
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let cfg_dir = current_dir()
        .map_err(|e| ConfigError::Message(format!("could not get current dir: {e}")))?
        .join("configuration");

    let env: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or("local".to_string())
        .try_into()
        .map_err(ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(config::File::from(cfg_dir.join("base.yaml")))
        .add_source(config::File::from(cfg_dir.join(format!("{env}.yaml"))))
        // env vars are always parsed as String, hence `serde-aux` on numeric
        // fields
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
