use std::{env, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub implicit_tls: bool,
    pub allow_invalid_certs: bool,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("implicit_tls", &self.implicit_tls)
            .field("allow_invalid_certs", &self.allow_invalid_certs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub smtp: SmtpConfig,
    pub recipient_email: String,
    pub upload_dir: PathBuf,
    pub mail_timeout: Duration,
    pub image_timeout: Duration,
}

impl Config {
    /// Reads the process environment; call `dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));
        let or = |name: &'static str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        Ok(Config {
            host: or("HOST", "0.0.0.0"),
            port: parse("PORT", &or("PORT", "3000"))?,
            database_url: or("DATABASE_URL", "sqlite://database.sqlite?mode=rwc"),
            smtp: SmtpConfig {
                host: required("SMTP_HOST")?,
                port: parse("SMTP_PORT", &or("SMTP_PORT", "465"))?,
                user: required("SMTP_USER")?,
                pass: required("SMTP_PASS")?,
                implicit_tls: parse("SMTP_IMPLICIT_TLS", &or("SMTP_IMPLICIT_TLS", "true"))?,
                allow_invalid_certs: parse("SMTP_ALLOW_INVALID_CERTS", &or("SMTP_ALLOW_INVALID_CERTS", "false"))?,
            },
            recipient_email: required("RECIPIENT_EMAIL")?,
            upload_dir: PathBuf::from(or("UPLOAD_DIR", "public/uploads")),
            mail_timeout: Duration::from_secs(parse("MAIL_TIMEOUT_SECS", &or("MAIL_TIMEOUT_SECS", "30"))?),
            image_timeout: Duration::from_secs(parse("IMAGE_TIMEOUT_SECS", &or("IMAGE_TIMEOUT_SECS", "30"))?),
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
