//! Configuration loading from environment variables.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use reqwest::Url;

const DEFAULT_URL: &str = "http://127.0.0.1:3000";

/// How edits and removals reach the backend.
///
/// Exactly one is active for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Lifecycle {
    /// PUT edits in place, DELETE removes
    #[default]
    Rest,
    /// Edits POST a copy and hide the original; removals only hide locally
    Soft,
}

impl std::str::FromStr for Lifecycle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(Lifecycle::Rest),
            "soft" => Ok(Lifecycle::Soft),
            other => bail!("Unknown lifecycle '{}' (expected 'rest' or 'soft')", other),
        }
    }
}

/// Login credentials for unattended use
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub lifecycle: Lifecycle,
    pub credentials: Option<Credentials>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Reads `FRIOCALC_URL`, `FRIOCALC_LIFECYCLE`, `FRIOCALC_USER` and
    /// `FRIOCALC_PASSWORD`, either from the environment or a `.env` file.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_url = lookup("FRIOCALC_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        let base_url = parse_base_url(&raw_url)?;

        let lifecycle = match lookup("FRIOCALC_LIFECYCLE") {
            Some(raw) => raw
                .parse::<Lifecycle>()
                .context("Invalid FRIOCALC_LIFECYCLE")?,
            None => Lifecycle::default(),
        };

        let credentials = match (lookup("FRIOCALC_USER"), lookup("FRIOCALC_PASSWORD")) {
            (Some(username), Some(password)) if !username.is_empty() => Some(Credentials {
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            base_url,
            lifecycle,
            credentials,
        })
    }

    /// Apply command-line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        url: Option<&str>,
        lifecycle: Option<Lifecycle>,
    ) -> Result<Self> {
        if let Some(url) = url {
            self.base_url = parse_base_url(url)?;
        }
        if let Some(lifecycle) = lifecycle {
            self.lifecycle = lifecycle;
        }
        Ok(self)
    }
}

/// Parse the backend URL. The path always ends in `/` so endpoints join
/// beneath it rather than replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("Invalid backend URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Backend URL must use http or https: {}", raw);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
