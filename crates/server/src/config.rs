use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tally_core::Money;
use tally_extract::{Categorizer, CategorizerError, OpenAiConfig};
use tally_reconcile::BillMatcher;
use thiserror::Error;

pub const CONFIG_ENV: &str = "TALLY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "tally.toml";
/// Upper bound on the matcher's date window; larger values are clamped.
pub const MAX_DATE_WINDOW_DAYS: i64 = 366;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to load categorizer rules: {0}")]
    Rules(#[from] CategorizerError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub amount_tolerance: Decimal,
    pub date_window_days: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        let matcher = BillMatcher::default();
        Self {
            amount_tolerance: matcher.amount_tolerance.as_decimal(),
            date_window_days: matcher.date_window_days,
        }
    }
}

impl ReconcileConfig {
    /// Negative settings are treated as zero, windows beyond a year as a year.
    pub fn matcher(&self) -> BillMatcher {
        BillMatcher::new(
            Money::from_decimal(self.amount_tolerance.max(Decimal::ZERO)),
            self.date_window_days.clamp(0, MAX_DATE_WINDOW_DAYS),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub ai: OpenAiConfig,
    pub reconcile: ReconcileConfig,
    /// Optional `[[rule]]` file replacing the built-in keyword table.
    pub categorizer_rules: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tally.db"),
            bind_addr: "127.0.0.1:8080".to_string(),
            ai: OpenAiConfig::default(),
            reconcile: ReconcileConfig::default(),
            categorizer_rules: None,
        }
    }
}

impl Config {
    /// Read `$TALLY_CONFIG` (or `./tally.toml`), then apply environment
    /// overrides. A missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("TALLY_DATABASE") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TALLY_BIND") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("TALLY_AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Some(v) = lookup("TALLY_AI_MODEL") {
            self.ai.model = v;
        }
        if let Some(v) = lookup("TALLY_AI_API_KEY") {
            self.ai.api_key = Some(v);
        }
    }

    pub fn categorizer(&self) -> Result<Categorizer, ConfigError> {
        match &self.categorizer_rules {
            Some(path) => Ok(Categorizer::from_file(path)?),
            None => Ok(Categorizer::default()),
        }
    }
}
