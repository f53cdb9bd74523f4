//! Server configuration.
//!
//! Every flag has an `HRDESK_*` environment fallback so container
//! deployments can run `hrdesk serve` with no arguments.

use clap::Args;
use std::path::PathBuf;
use thiserror::Error;

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted access token lifetime: one day.
pub const MAX_ACCESS_TTL_MINUTES: u32 = 24 * 60;
/// Longest accepted refresh session: one year.
pub const MAX_REFRESH_TTL_DAYS: u32 = 365;
/// Longest accepted reset link lifetime: one week.
pub const MAX_RESET_TTL_MINUTES: u32 = 7 * 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be at least {MIN_SECRET_LEN} bytes")]
    ShortSecret(&'static str),
    #[error("access and refresh secrets must differ")]
    SharedSecret,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{name} must be at most {max}")]
    TooLarge { name: &'static str, max: u32 },
}

/// Flags of `hrdesk serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HRDESK_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "HRDESK_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Database file
    #[arg(long, env = "HRDESK_DB", default_value = "hrdesk.redb")]
    pub db: PathBuf,

    /// HMAC secret for access tokens
    #[arg(long, env = "HRDESK_ACCESS_SECRET", hide_env_values = true)]
    pub access_secret: String,

    /// HMAC secret for refresh tokens
    #[arg(long, env = "HRDESK_REFRESH_SECRET", hide_env_values = true)]
    pub refresh_secret: String,

    #[arg(long, env = "HRDESK_ACCESS_TTL_MINUTES", default_value_t = 15)]
    pub access_ttl_minutes: u32,

    #[arg(long, env = "HRDESK_REFRESH_TTL_DAYS", default_value_t = 7)]
    pub refresh_ttl_days: u32,

    #[arg(long, env = "HRDESK_RESET_TTL_MINUTES", default_value_t = 30)]
    pub reset_ttl_minutes: u32,

    /// Frontend page that receives `?token=...`
    #[arg(
        long,
        env = "HRDESK_RESET_URL_BASE",
        default_value = "http://localhost:3000/reset-password"
    )]
    pub reset_url_base: String,

    /// Allowed CORS origins, comma separated. Empty disables CORS.
    #[arg(long, env = "HRDESK_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Mark the refresh cookie `Secure`
    #[arg(long, env = "HRDESK_COOKIE_SECURE")]
    pub cookie_secure: bool,

    /// Login and forgot-password attempts per email per minute
    #[arg(long, env = "HRDESK_AUTH_RATE_PER_MINUTE", default_value_t = 10)]
    pub auth_rate_per_minute: u32,
}

/// Validated runtime settings shared by the router.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db: PathBuf,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_minutes: u32,
    pub refresh_ttl_days: u32,
    pub reset_ttl_minutes: u32,
    pub reset_url_base: String,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
    pub auth_rate_per_minute: u32,
}

impl ServerConfig {
    /// Defaults for everything except the two secrets.
    pub fn with_secrets(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            db: PathBuf::from("hrdesk.redb"),
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
            reset_ttl_minutes: 30,
            reset_url_base: "http://localhost:3000/reset-password".into(),
            cors_origins: Vec::new(),
            cookie_secure: false,
            auth_rate_per_minute: 10,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ShortSecret("access secret"));
        }
        if self.refresh_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ShortSecret("refresh secret"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::SharedSecret);
        }
        for (name, value) in [
            ("access_ttl_minutes", self.access_ttl_minutes),
            ("refresh_ttl_days", self.refresh_ttl_days),
            ("reset_ttl_minutes", self.reset_ttl_minutes),
            ("auth_rate_per_minute", self.auth_rate_per_minute),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        for (name, value, max) in [
            ("access_ttl_minutes", self.access_ttl_minutes, MAX_ACCESS_TTL_MINUTES),
            ("refresh_ttl_days", self.refresh_ttl_days, MAX_REFRESH_TTL_DAYS),
            ("reset_ttl_minutes", self.reset_ttl_minutes, MAX_RESET_TTL_MINUTES),
        ] {
            if value > max {
                return Err(ConfigError::TooLarge { name, max });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            db: args.db,
            access_secret: args.access_secret,
            refresh_secret: args.refresh_secret,
            access_ttl_minutes: args.access_ttl_minutes,
            refresh_ttl_days: args.refresh_ttl_days,
            reset_ttl_minutes: args.reset_ttl_minutes,
            reset_url_base: args.reset_url_base,
            cors_origins: args
                .cors_origins
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            cookie_secure: args.cookie_secure,
            auth_rate_per_minute: args.auth_rate_per_minute,
        }
    }
}
