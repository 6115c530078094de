//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::TokenSettings;
use clap::Parser;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tubehouse",
    about = "User accounts, sessions and channel profiles"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "tubehouse.db")]
    pub database: String,

    /// Access token lifetime, e.g. "900", "15m", "1h"
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY", default_value = "15m", value_parser = parse_duration)]
    pub access_token_expiry: u64,

    /// Refresh token lifetime, e.g. "10d"
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY", default_value = "10d", value_parser = parse_duration)]
    pub refresh_token_expiry: u64,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET instead
    #[arg(long)]
    pub access_token_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET instead
    #[arg(long)]
    pub refresh_token_secret_file: Option<String>,

    /// Prefix for stored media URLs, e.g. "https://api.example.com"
    #[arg(long, env = "MEDIA_BASE_URL", default_value = "")]
    pub media_base_url: String,

    /// Do not set the Secure flag on cookies (plain HTTP development only)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Upper bound for token lifetimes, in seconds.
const MAX_DURATION: u64 = 10 * 365 * 24 * 60 * 60;

/// Parse a lifetime in seconds. Accepts a bare number or a number with an
/// `s`, `m`, `h` or `d` suffix.
pub fn parse_duration(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, multiplier) = match s.char_indices().last() {
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 60 * 60),
        Some((i, 'd')) => (&s[..i], 24 * 60 * 60),
        Some(_) => (s, 1),
        None => return Err("Duration cannot be empty".to_string()),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid duration: {}", s))?;
    if value == 0 {
        return Err(format!("Duration must be positive: {}", s));
    }
    value
        .checked_mul(multiplier)
        .filter(|secs| *secs <= MAX_DURATION)
        .ok_or_else(|| format!("Duration is longer than 10 years: {}", s))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a token secret from an environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            env = %env_var,
            "Token secret is required. Set the environment variable (recommended) or pass a secret file"
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            env = %env_var,
            "Token secret is shorter than {} characters. Use a longer secret",
            MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Build token settings, refusing to sign both token classes with one secret.
pub fn token_settings(
    access_secret: String,
    refresh_secret: String,
    access_duration: u64,
    refresh_duration: u64,
) -> Option<TokenSettings> {
    if access_secret == refresh_secret {
        error!("Access and refresh token secrets must differ");
        return None;
    }

    Some(TokenSettings {
        access_secret: access_secret.into_bytes(),
        access_duration,
        refresh_secret: refresh_secret.into_bytes(),
        refresh_duration,
    })
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    tokens: TokenSettings,
    insecure_cookies: bool,
    media_base_url: String,
) -> ServerConfig {
    ServerConfig {
        db,
        tokens,
        secure_cookies: !insecure_cookies,
        media_base_url,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
