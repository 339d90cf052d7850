/// Configuration management for the API server
///
/// Loaded from environment variables (a `.env` file is honoured in
/// development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `APP_BASE_URL`: public origin used in magic links (default: http://localhost:8080)
/// - `AUTH_SECRET`: signing secret for magic links, at least 32 bytes (required)
/// - `SESSION_TTL_HOURS`: session lifetime (default: 168)
/// - `SESSION_REFRESH_HOURS`: sliding refresh window (default: 24)
/// - `MAGIC_LINK_TTL_MINUTES`: link lifetime (default: 5)
/// - `MAGIC_LINK_ALLOW_SIGN_UP`: create accounts for unknown emails (default: true)
/// - `MAGIC_LINK_WEBHOOK_URL`: email relay endpoint; links are only logged when unset
/// - `PLATFORM_PARTNER_SLUG`: partner whose owners/admins are platform admins (default: alifh)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for permissive (default: *)
/// - `PRODUCTION`: enables `Secure` cookies and HSTS (default: false)
///
/// # Example
///
/// ```no_run
/// use alifh_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use alifh_shared::auth::middleware::SessionSettings;
use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Shortest accepted `AUTH_SECRET`
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted session lifetime and refresh window (one year)
pub const MAX_SESSION_HOURS: i64 = 24 * 365;

/// Longest accepted magic-link lifetime (one day)
pub const MAX_MAGIC_LINK_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Public origin, e.g. `https://alifh.com`
    pub base_url: String,

    pub cors_origins: Vec<String>,

    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Magic-link signing secret. Generate with `openssl rand -hex 32`.
    #[serde(skip_serializing)]
    pub secret: String,

    pub session_ttl_hours: i64,
    pub session_refresh_hours: i64,
    pub magic_link_ttl_minutes: i64,
    pub magic_link_allow_sign_up: bool,
    pub magic_link_webhook_url: Option<String>,
    pub platform_partner_slug: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let secret = env::var("AUTH_SECRET")
            .map_err(|_| anyhow::anyhow!("AUTH_SECRET environment variable is required"))?;

        let config = Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("API_PORT", 8080)?,
                base_url: env::var("APP_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
                cors_origins: parse_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
                production: parse_var("PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: AuthConfig {
                secret,
                session_ttl_hours: parse_var("SESSION_TTL_HOURS", 168)?,
                session_refresh_hours: parse_var("SESSION_REFRESH_HOURS", 24)?,
                magic_link_ttl_minutes: parse_var("MAGIC_LINK_TTL_MINUTES", 5)?,
                magic_link_allow_sign_up: parse_var("MAGIC_LINK_ALLOW_SIGN_UP", true)?,
                magic_link_webhook_url: env::var("MAGIC_LINK_WEBHOOK_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
                platform_partner_slug: env::var("PLATFORM_PARTNER_SLUG")
                    .unwrap_or_else(|_| "alifh".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make the server insecure or unusable
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("AUTH_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if !(1..=MAX_SESSION_HOURS).contains(&self.auth.session_ttl_hours) {
            anyhow::bail!("SESSION_TTL_HOURS must be between 1 and {}", MAX_SESSION_HOURS);
        }
        if !(0..=self.auth.session_ttl_hours).contains(&self.auth.session_refresh_hours) {
            anyhow::bail!("SESSION_REFRESH_HOURS must be between 0 and SESSION_TTL_HOURS");
        }
        if !(1..=MAX_MAGIC_LINK_MINUTES).contains(&self.auth.magic_link_ttl_minutes) {
            anyhow::bail!("MAGIC_LINK_TTL_MINUTES must be between 1 and {}", MAX_MAGIC_LINK_MINUTES);
        }
        reqwest::Url::parse(&self.api.base_url)
            .with_context(|| format!("APP_BASE_URL is not a valid URL: {}", self.api.base_url))?;

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            ttl: Duration::hours(self.auth.session_ttl_hours),
            refresh_after: Duration::hours(self.auth.session_refresh_hours),
            platform_partner_slug: self.auth.platform_partner_slug.clone(),
        }
    }

    /// Cookie `Max-Age` matching the session lifetime
    pub fn session_max_age_seconds(&self) -> i64 {
        self.auth.session_ttl_hours * 3600
    }

    pub fn magic_link_ttl(&self) -> Duration {
        Duration::minutes(self.auth.magic_link_ttl_minutes)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        _ => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                session_ttl_hours: 168,
                session_refresh_hours: 24,
                magic_link_ttl_minutes: 5,
                magic_link_allow_sign_up: true,
                magic_link_webhook_url: None,
                platform_partner_slug: "alifh".to_string(),
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_session_settings() {
        let settings = config().session_settings();
        assert_eq!(settings.ttl, Duration::days(7));
        assert_eq!(settings.refresh_after, Duration::days(1));
        assert_eq!(config().session_max_age_seconds(), 604_800);
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let mut short = config();
        short.auth.secret = "too-short".to_string();
        assert!(short.validate().is_err());

        let mut bad_url = config();
        bad_url.api.base_url = "not a url".to_string();
        assert!(bad_url.validate().is_err());

        let mut bad_ttl = config();
        bad_ttl.auth.magic_link_ttl_minutes = 0;
        assert!(bad_ttl.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_durations() {
        let mut huge_ttl = config();
        huge_ttl.auth.session_ttl_hours = i64::MAX;
        assert!(huge_ttl.validate().is_err());

        let mut huge_refresh = config();
        huge_refresh.auth.session_refresh_hours = i64::MAX / 2;
        assert!(huge_refresh.validate().is_err());

        let mut refresh_past_ttl = config();
        refresh_past_ttl.auth.session_refresh_hours = refresh_past_ttl.auth.session_ttl_hours + 1;
        assert!(refresh_past_ttl.validate().is_err());

        let mut huge_link = config();
        huge_link.auth.magic_link_ttl_minutes = i64::MAX;
        assert!(huge_link.validate().is_err());

        let mut longest = config();
        longest.auth.session_ttl_hours = MAX_SESSION_HOURS;
        longest.auth.session_refresh_hours = MAX_SESSION_HOURS;
        longest.auth.magic_link_ttl_minutes = MAX_MAGIC_LINK_MINUTES;
        assert!(longest.validate().is_ok());
        assert_eq!(longest.session_settings().ttl, Duration::days(365));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("https://alifh.com, https://admin.alifh.com,,"),
            vec!["https://alifh.com", "https://admin.alifh.com"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_secret_not_serialized() {
        let json = serde_json::to_value(config()).unwrap();
        assert!(json["auth"].get("secret").is_none());
    }
}
