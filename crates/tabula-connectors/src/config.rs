//! Fetch configuration from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Deadline for a single HTTP fetch, in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Keep at most this many tables per document. 0 = no limit.
    pub max_tables: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: default_user_agent(),
            max_tables: 0,
        }
    }
}

fn default_user_agent() -> String {
    format!("tabula/{}", env!("CARGO_PKG_VERSION"))
}

impl FetchConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            timeout_secs: std::env::var("TABULA_FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid TABULA_FETCH_TIMEOUT_SECS")?,
            user_agent: std::env::var("TABULA_USER_AGENT")
                .unwrap_or_else(|_| default_user_agent()),
            max_tables: std::env::var("TABULA_MAX_TABLES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .context("Invalid TABULA_MAX_TABLES")?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
