// Frontend configuration, loaded with the 'config' crate and 'dotenv'

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    // Base URL of the listing search API, e.g. http://localhost:8080/api
    pub api_base_url: String,
    pub page_size: u32,
    pub fetch_timeout_secs: u64,
    // Used when the filter query carries no sort, in the API's "field,dir" form
    pub default_sort: String,
    pub proxy_url: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("api_base_url", "http://localhost:8080/api")?
            .set_default("page_size", 12)?
            .set_default("fetch_timeout_secs", 15)?
            .set_default("default_sort", "createdAt,desc")?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Double underscore so keys like APP__API_BASE_URL keep their own underscores
            .add_source(Environment::with_prefix("APP").separator("__"));

        let settings: Settings = builder
            .build()
            .context("Failed to assemble configuration sources")?
            .try_deserialize()
            .context("Failed to deserialize settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be greater than zero");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be greater than zero");
        }
        url::Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid api_base_url '{}'", self.api_base_url))?;
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests(api_base_url: &str) -> Self {
        Settings {
            server_address: "127.0.0.1:0".to_string(),
            api_base_url: api_base_url.to_string(),
            page_size: 12,
            fetch_timeout_secs: 15,
            default_sort: "createdAt,desc".to_string(),
            proxy_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut settings = Settings::for_tests("http://localhost:8080/api");
        settings.page_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_base_url() {
        let settings = Settings::for_tests("not a url");
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("api_base_url"));
    }

    #[test]
    fn fetch_timeout_is_in_seconds() {
        let settings = Settings::for_tests("http://localhost:8080/api");
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(15));
    }
}
