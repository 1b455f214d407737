//! Configuration: ledger environments and import policy
//!
//! Lives in `<config dir>/felpos/config.toml`; `FELPOS_CONFIG` points at
//! an alternate file, and `.env` files are honored via dotenvy.
//!
//! ```toml
//! current_environment = "production"
//!
//! [import]
//! default_product_kind = "storable"
//! payment_journal_separator = ""
//!
//! [environment.production]
//! url = "https://ledger.example.com"
//! database = "losgatos"
//! username = "importer"
//! api_key = "..."
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ledger::ProductKind;

/// Connection profile for one ledger deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub api_key: String,
}

/// Import policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Kind given to products created on a resolution miss.
    pub default_product_kind: ProductKind,
    /// Separator placed between the two payment-journal name fragments.
    pub payment_journal_separator: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            default_product_kind: ProductKind::Storable,
            payment_journal_separator: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub current_environment: Option<String>,
    #[serde(rename = "environment")]
    pub environments: HashMap<String, EnvironmentConfig>,
    pub import: ImportOptions,
}

impl Config {
    /// Resolve the config file path; `FELPOS_CONFIG` wins over the
    /// platform config directory.
    pub fn path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("FELPOS_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(dir.join("felpos").join("config.toml"))
    }

    /// Load the config file, returning defaults when it does not exist.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = Self::path()?;
        if !path.exists() {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// The environment selected by flag or config file, by name.
    pub fn environment<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a EnvironmentConfig)> {
        let name = name.or(self.current_environment.as_deref()).context(
            "No environment selected. Set current_environment in the config file or pass --env.",
        )?;
        let env = self
            .environments
            .get(name)
            .with_context(|| format!("Unknown environment: {name}"))?;
        Ok((name, env))
    }
}
