use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "tender_scraper";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Settings that outlive a single invocation. Flags on `run` override the
/// per-run knobs; these cover where data goes and how requests look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Source tag stored with every tender.
    pub source: String,
    pub user_agent: String,
}

impl Settings {
    /// Defaults, then `tender_scraper.toml` if present, then `TENDER_*`.
    pub fn load() -> Result<Self> {
        Self::from_builder(
            Config::builder().add_source(File::with_name(CONFIG_FILE).required(false)),
        )
    }

    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        builder
            .set_default("database_path", "data/tenders.sqlite")?
            .set_default("source", "nprocure")?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .add_source(Environment::with_prefix("TENDER"))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}
