//! Server configuration, read from the environment.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub bind_address: String,
    /// Postgres connection string.
    pub database_url: String,
    /// Items or replies per listing page.
    pub page_length: u64,
    /// Seconds between expired-kick sweeps. Zero disables the sweep.
    pub kick_sweep_interval: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:4001".to_string());

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let page_length = match std::env::var("PAGE_LENGTH") {
            Ok(raw) => raw
                .parse()
                .context("PAGE_LENGTH must be a positive integer")?,
            Err(_) => 10,
        };
        anyhow::ensure!(page_length > 0, "PAGE_LENGTH must be positive");

        let kick_sweep_interval = match std::env::var("KICK_SWEEP_INTERVAL") {
            Ok(raw) => raw
                .parse()
                .context("KICK_SWEEP_INTERVAL must be a number of seconds")?,
            Err(_) => 300,
        };

        Ok(Self {
            bind_address,
            database_url,
            page_length,
            kick_sweep_interval,
        })
    }

    /// Create a default config for testing
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            page_length: 10,
            kick_sweep_interval: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_for_test();
        assert_eq!(config.page_length, 10);
        assert_eq!(config.kick_sweep_interval, 0);
    }
}
