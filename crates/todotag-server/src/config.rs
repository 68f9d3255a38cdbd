use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Values that ship in sample `.env` files and must be replaced.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub api_key: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match lookup("TODOTAG_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("TODOTAG_PORT is not a port number: {}", raw))?,
            None => 3000,
        };

        Ok(Self {
            host: lookup("TODOTAG_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: lookup("TODOTAG_DB_PATH")
                .unwrap_or_else(|| "todotag.db".into())
                .into(),
            jwt_secret: lookup("TODOTAG_JWT_SECRET")
                .unwrap_or_else(|| "dev-secret-change-me".into()),
            api_key: lookup("TODOTAG_API_KEY").unwrap_or_else(|| "dev-secret-change-me".into()),
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    /// Names of the credentials still set to an empty or sample value.
    pub fn placeholder_secrets(&self) -> Vec<&'static str> {
        let mut weak = Vec::new();
        if is_placeholder(&self.jwt_secret) {
            weak.push("TODOTAG_JWT_SECRET");
        }
        if is_placeholder(&self.api_key) {
            weak.push("TODOTAG_API_KEY");
        }
        weak
    }
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || PLACEHOLDER_SECRETS.contains(&value)
}
