//! # Ledger Configuration
//!
//! Configuration management for report assembly.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_MAX_PAGE_SIZE=200                                            │
//! │     TALLY_ENRICHMENT_ENABLED=false                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally-ledger/ledger.toml (Linux)                         │
//! │     ~/Library/Application Support/com.tally.ledger/ledger.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ledger.toml
//! [report]
//! default_page_size = 50
//! max_page_size = 500
//! include_grouped_ledgers = true
//!
//! [enrichment]
//! enabled = true
//! concurrency = 8
//!
//! [engine]
//! parallel_groups = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};

/// Page size used when neither the query nor the config names one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

// =============================================================================
// Report Settings
// =============================================================================

/// Report shape and paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Page size when the query does not name one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest page a caller may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Whether single-customer reports also carry `groupedLedgers`.
    #[serde(default = "default_true")]
    pub include_grouped_ledgers: bool,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            include_grouped_ledgers: true,
        }
    }
}

// =============================================================================
// Enrichment Settings
// =============================================================================

/// Line-item enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Line-item fetches in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    8
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        EnrichmentSettings {
            enabled: true,
            concurrency: default_concurrency(),
        }
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Aggregate customer groups on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel_groups: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            parallel_groups: true,
        }
    }
}

// =============================================================================
// Main Ledger Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub report: ReportSettings,

    #[serde(default)]
    pub enrichment: EnrichmentSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ledger.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ServiceResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ServiceError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ServiceError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.report.max_page_size == 0 {
            return Err(ServiceError::InvalidConfig(
                "max_page_size must be greater than 0".into(),
            ));
        }

        if self.report.default_page_size == 0
            || self.report.default_page_size > self.report.max_page_size
        {
            return Err(ServiceError::InvalidConfig(format!(
                "default_page_size must be between 1 and max_page_size ({}), got {}",
                self.report.max_page_size, self.report.default_page_size
            )));
        }

        if self.enrichment.concurrency == 0 {
            return Err(ServiceError::InvalidConfig(
                "enrichment concurrency must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TALLY_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(size) = lookup("TALLY_DEFAULT_PAGE_SIZE").and_then(|v| v.parse::<u32>().ok()) {
            debug!(size, "Overriding default page size from environment");
            self.report.default_page_size = size;
        }

        if let Some(size) = lookup("TALLY_MAX_PAGE_SIZE").and_then(|v| v.parse::<u32>().ok()) {
            debug!(size, "Overriding max page size from environment");
            self.report.max_page_size = size;
        }

        if let Some(flag) = lookup("TALLY_INCLUDE_GROUPED_LEDGERS").and_then(|v| parse_flag(&v)) {
            self.report.include_grouped_ledgers = flag;
        }

        if let Some(flag) = lookup("TALLY_ENRICHMENT_ENABLED").and_then(|v| parse_flag(&v)) {
            debug!(enabled = flag, "Overriding enrichment from environment");
            self.enrichment.enabled = flag;
        }

        if let Some(concurrency) =
            lookup("TALLY_ENRICHMENT_CONCURRENCY").and_then(|v| v.parse::<usize>().ok())
        {
            self.enrichment.concurrency = concurrency;
        }

        if let Some(flag) = lookup("TALLY_PARALLEL_GROUPS").and_then(|v| parse_flag(&v)) {
            self.engine.parallel_groups = flag;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            warn!(value = %other, "Unrecognised boolean in environment");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tally-config-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_defaults_match_report_contract() {
        let config = LedgerConfig::default();
        assert_eq!(config.report.default_page_size, 50);
        assert_eq!(config.report.max_page_size, 500);
        assert!(config.report.include_grouped_ledgers);
        assert!(config.enrichment.enabled);
        assert_eq!(config.enrichment.concurrency, 8);
        assert!(config.engine.parallel_groups);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [report]
            max_page_size = 100

            [enrichment]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.report.max_page_size, 100);
        assert_eq!(config.report.default_page_size, 50);
        assert!(!config.enrichment.enabled);
        assert_eq!(config.enrichment.concurrency, 8);
    }

    #[test]
    fn test_page_size_bounds_validated() {
        let mut config = LedgerConfig::default();

        config.report.default_page_size = 600;
        assert!(config.validate().is_err());

        config.report.default_page_size = 0;
        assert!(config.validate().is_err());

        config.report.default_page_size = 50;
        config.enrichment.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_MAX_PAGE_SIZE", "200"),
            ("TALLY_DEFAULT_PAGE_SIZE", "not-a-number"),
            ("TALLY_ENRICHMENT_ENABLED", "off"),
            ("TALLY_ENRICHMENT_CONCURRENCY", "2"),
            ("TALLY_PARALLEL_GROUPS", "maybe"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.report.max_page_size, 200);
        assert_eq!(config.report.default_page_size, 50);
        assert!(!config.enrichment.enabled);
        assert_eq!(config.enrichment.concurrency, 2);
        assert!(config.engine.parallel_groups);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("ledger.toml");
        let mut config = LedgerConfig::default();
        config.report.max_page_size = 120;
        config.engine.parallel_groups = false;

        config.save(Some(path.clone())).unwrap();
        let loaded = LedgerConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.report.max_page_size, 120);
        assert!(!loaded.engine.parallel_groups);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let path = temp_path("broken.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[report\nmax_page_size = ").unwrap();

        let err = LedgerConfig::load(Some(path.clone())).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(LedgerConfig::load_or_default(Some(path.clone())), LedgerConfig::default());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_toml_has_one_section_per_concern() {
        let toml_str = toml::to_string_pretty(&LedgerConfig::default()).unwrap();
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[enrichment]"));
        assert!(toml_str.contains("[engine]"));
    }
}
