use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use futurebox_crypto::PasswordPolicy;

/// Placeholder JWT secret used when nothing is configured.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Session lifetimes outside this range are refused.
const SESSION_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// `None` means the built-in development fallback is used.
    pub crypto_secret: Option<String>,
    pub jwt_secret: String,
    pub session_days: i64,
    pub passwords: PasswordPolicy,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PasswordPolicy::default();

        let session_days = parse_or(&lookup, "FUTUREBOX_SESSION_DAYS", 30)?;
        if !SESSION_DAYS_RANGE.contains(&session_days) {
            bail!(
                "FUTUREBOX_SESSION_DAYS must be between {} and {}, got {}",
                SESSION_DAYS_RANGE.start(),
                SESSION_DAYS_RANGE.end(),
                session_days
            );
        }

        let passwords = PasswordPolicy::new(
            parse_or(&lookup, "FUTUREBOX_ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            parse_or(&lookup, "FUTUREBOX_ARGON2_ITERATIONS", defaults.iterations)?,
        )
        .context("FUTUREBOX_ARGON2_MEMORY_KIB / FUTUREBOX_ARGON2_ITERATIONS")?;

        Ok(Self {
            host: lookup("FUTUREBOX_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "FUTUREBOX_PORT", 3000)?,
            db_path: lookup("FUTUREBOX_DB_PATH")
                .unwrap_or_else(|| "futurebox.db".into())
                .into(),
            crypto_secret: lookup("FUTUREBOX_CRYPTO_SECRET"),
            jwt_secret: lookup("FUTUREBOX_JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.into()),
            session_days,
            passwords,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: '{}'", key, raw)),
        None => Ok(default),
    }
}
