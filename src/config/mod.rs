// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{ProxyError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

/// Plain variables honoured for deployments that predate the prefixed ones.
const LEGACY_API_KEY_VAR: &str = "NVIDIA_API_KEY";
const LEGACY_AUTH_TOKEN_VAR: &str = "AUTH_TOKEN";

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. CLI arguments (highest, applied by the caller)
    /// 2. Environment variables (`NIM2CLAUDE_SECTION__KEY`)
    /// 3. Config file (`path`, or `~/.nim2claude/config.toml` if present)
    /// 4. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p.to_path_buf()).required(true),
            None => File::from(Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            // Override with environment variables (prefix: NIM2CLAUDE_)
            .add_source(
                Environment::with_prefix("NIM2CLAUDE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        app_config.apply_legacy_env(|name| std::env::var(name).ok());
        Ok(app_config)
    }

    /// Fill the upstream key and auth token from the legacy plain variables
    /// when no other source set them.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.upstream.api_key.is_empty() {
            if let Some(key) = lookup(LEGACY_API_KEY_VAR).filter(|k| !k.is_empty()) {
                self.upstream.api_key = key;
            }
        }
        if self.auth.token.is_none() {
            self.auth.token = lookup(LEGACY_AUTH_TOKEN_VAR).filter(|t| !t.is_empty());
        }
    }

    fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nim2claude")
            .join("config.toml")
    }
}
