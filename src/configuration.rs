use std::{path::Path, time::Duration};

use config::{Config, ConfigError, File};
use lettre::message::Mailbox;
use secrecy::SecretString;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub smtp: SmtpSettings,
    #[serde(skip, default = "Environment::default")]
    pub environment: Environment,
}

impl Settings {
    /// Error details are only ever sent to clients while developing.
    pub fn expose_error_details(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    #[serde(default)]
    pub cors_policy: CorsPolicy,
}

/// Which set of CORS headers every response carries.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorsPolicy {
    #[default]
    Minimal,
    Extended,
}

#[derive(Deserialize, Debug)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub target_email: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl SmtpSettings {
    /// Port 465 speaks TLS from the first byte, every other port upgrades with STARTTLS.
    pub fn secure(&self) -> bool {
        self.port == 465
    }

    /// Falls back to the target address when no dedicated login is configured.
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(&self.target_email)
    }

    pub fn sender(&self) -> Result<Mailbox, lettre::address::AddressError> {
        Ok(Mailbox::new(
            Some("Contact Form".to_string()),
            self.user().parse()?,
        ))
    }

    pub fn recipient(&self) -> Result<Mailbox, lettre::address::AddressError> {
        Ok(Mailbox::new(None, self.target_email.parse()?))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {e}")))?;
    let environment = resolve_environment(
        std::env::var("APP_ENVIRONMENT").ok(),
        std::env::var("NODE_ENV").ok(),
    )
    .map_err(ConfigError::Message)?;

    load_settings(&base_path.join("configuration"), environment, |key| {
        std::env::var(key).ok()
    })
}

/// `APP_ENVIRONMENT` must name a known environment. `NODE_ENV` is shared with
/// frontend tooling and may hold values like `test`, which count as production.
pub fn resolve_environment(
    app_environment: Option<String>,
    node_env: Option<String>,
) -> Result<Environment, String> {
    match app_environment {
        Some(value) => Environment::try_from(value),
        None => Ok(node_env
            .and_then(|value| Environment::try_from(value).ok())
            .unwrap_or_default()),
    }
}

/// Layers the yaml files, `APP_*` variables and the `SMTP_*` overrides
/// returned by `smtp_var`.
fn load_settings(
    configuration_directory: &Path,
    environment: Environment,
    smtp_var: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")))
        .add_source(File::from(configuration_directory.join(environment_filename)))
        // e.g. `APP_APPLICATION__PORT=5001` sets `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("smtp.host", smtp_var("SMTP_HOST"))?
        .set_override_option("smtp.port", smtp_var("SMTP_PORT"))?
        .set_override_option("smtp.user", smtp_var("SMTP_USER"))?
        .set_override_option("smtp.password", smtp_var("SMTP_PASS"))?
        .build()?;

    let mut settings = settings.try_deserialize::<Settings>()?;
    settings.environment = environment;
    Ok(settings)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not a supported environment. Use either `development` or `production`."
            )),
        }
    }
}
