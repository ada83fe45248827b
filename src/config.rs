//! TOML configuration parsing and validation.
//!
//! A single file (default `./config/site.toml`) describes how to reach the
//! content store, where images are served from, the HTTP bind address and
//! the optional mail integration used by the contact form.
//!
//! Secrets are never stored in the file. `[store].token_env` and
//! `[mail].api_key_env` name environment variables that are read at
//! client construction time.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_site_name")]
    pub site_name: String,
    /// Absolute base URL used for canonical links (e.g. `https://acme.example`).
    #[serde(default)]
    pub base_url: Option<String>,
    pub store: StoreConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub mail: Option<MailConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_site_name() -> String {
    "Showroom".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub project_id: String,
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_use_cdn")]
    pub use_cdn: bool,
    /// Name of the environment variable holding the API token.
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Overrides the derived `https://<project>.api.sanity.io` host.
    #[serde(default)]
    pub api_host: Option<String>,
}

fn default_api_version() -> String {
    "2024-01-01".to_string()
}
fn default_use_cdn() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImagesConfig {
    #[serde(default = "default_cdn_host")]
    pub cdn_host: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            cdn_host: default_cdn_host(),
            placeholder: default_placeholder(),
        }
    }
}

fn default_cdn_host() -> String {
    "https://cdn.sanity.io".to_string()
}
fn default_placeholder() -> String {
    "/static/placeholder.svg".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContactConfig {
    /// Address that receives a notification for every submission.
    #[serde(default)]
    pub notify_to: Option<String>,
    /// Send the submitter a confirmation message.
    #[serde(default)]
    pub confirm_submitter: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub endpoint: String,
    pub from: String,
    #[serde(default = "default_mail_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_mail_key_env() -> String {
    "MAIL_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl StoreConfig {
    /// Reads the API token from the configured environment variable, if any.
    pub fn token(&self) -> Option<String> {
        self.token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let store = &config.store;

    if store.project_id.is_empty()
        || !store
            .project_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        anyhow::bail!(
            "store.project_id must be non-empty and contain only letters, digits or '-': '{}'",
            store.project_id
        );
    }

    if store.dataset.trim().is_empty() {
        anyhow::bail!("store.dataset must not be empty");
    }

    if store.api_version != "1"
        && chrono::NaiveDate::parse_from_str(&store.api_version, "%Y-%m-%d").is_err()
    {
        anyhow::bail!(
            "store.api_version must be '1' or a YYYY-MM-DD date, got '{}'",
            store.api_version
        );
    }

    if store.timeout_secs == 0 {
        anyhow::bail!("store.timeout_secs must be > 0");
    }

    if let Some(ref to) = config.contact.notify_to {
        if !crate::contact::is_valid_email(to) {
            anyhow::bail!("contact.notify_to is not a valid email address: '{}'", to);
        }
    }

    if let Some(ref mail) = config.mail {
        if !mail.endpoint.starts_with("http://") && !mail.endpoint.starts_with("https://") {
            anyhow::bail!("mail.endpoint must be an http(s) URL");
        }
    }

    Ok(())
}
