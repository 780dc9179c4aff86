use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::info;

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

/// Ten years; longer lifetimes overflow token expiry arithmetic.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub civic_secret: Option<String>,
    pub civic_issuer: Option<String>,
    pub cookie_secure: bool,
    pub max_asset_bytes: usize,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("LAUNCHPAD_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LAUNCHPAD_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let cors_origins = optional("LAUNCHPAD_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: try_load("LAUNCHPAD_HOST", "0.0.0.0")?,
            port: try_load("LAUNCHPAD_PORT", "3000")?,
            db_path: try_load("LAUNCHPAD_DB_PATH", "launchpad.db")?,
            jwt_secret,
            token_ttl_hours: check_ttl(try_load("LAUNCHPAD_TOKEN_TTL_HOURS", "168")?)?,
            civic_secret: optional("LAUNCHPAD_CIVIC_SECRET"),
            civic_issuer: optional("LAUNCHPAD_CIVIC_ISSUER"),
            cookie_secure: try_load("LAUNCHPAD_COOKIE_SECURE", "false")?,
            max_asset_bytes: try_load("LAUNCHPAD_MAX_ASSET_BYTES", "5242880")?,
            cors_origins,
        })
    }
}

fn check_ttl(hours: i64) -> Result<i64> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        bail!("LAUNCHPAD_TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {hours}");
    }
    Ok(hours)
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}
