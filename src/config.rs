//! Environment-derived runtime configuration.
//! Built once in `main` and injected into the server; handlers never read the
//! environment themselves.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// HMAC secret for session tokens. Required.
    pub jwt_secret: String,
    /// Postgres connection string. Required.
    pub database_url: String,
    /// HTTP listen port. Defaults to 5000.
    pub port: u16,
    /// Browser origin allowed to send credentialed CORS requests.
    pub client_url: Option<String>,
    /// True when NODE_ENV=production; controls the Secure cookie flag.
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse::<u16>().with_context(|| format!("PORT is not a valid port: {v}"))?,
            Err(_) => 5000,
        };
        let client_url = std::env::var("CLIENT_URL").ok().filter(|s| !s.is_empty());
        let production = std::env::var("NODE_ENV").map(|v| v == "production").unwrap_or(false);
        Ok(Self { jwt_secret, database_url, port, client_url, production })
    }
}
