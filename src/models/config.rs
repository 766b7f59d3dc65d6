//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::LookupConfig;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input, output and store locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Markup and classification rules
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Static lookup tables
    #[serde(default)]
    pub lookup: LookupConfig,

    /// File watcher behavior
    #[serde(default)]
    pub watch: WatchConfig,

    /// Wiki download settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.extraction.excellence_marker.trim().is_empty() {
            return Err(AppError::validation("extraction.excellence_marker is empty"));
        }
        if self.extraction.class_separator.trim().is_empty() {
            return Err(AppError::validation("extraction.class_separator is empty"));
        }
        if self.extraction.classes.is_empty() {
            return Err(AppError::validation("No classes defined"));
        }
        if self.extraction.default_class_groups.is_empty()
            || self
                .extraction
                .default_class_groups
                .iter()
                .any(|group| group.is_empty())
        {
            return Err(AppError::validation(
                "extraction.default_class_groups must hold non-empty groups",
            ));
        }
        for class in self.extraction.default_class_groups.iter().flatten() {
            if !self.extraction.classes.contains(class) {
                return Err(AppError::validation(format!(
                    "extraction.default_class_groups: unknown class '{class}'"
                )));
            }
        }
        if self.paths.input_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.input_dir is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if !self.fetch.base_url.ends_with('/') {
            return Err(AppError::validation(
                "fetch.base_url must end with '/' so page titles can be appended",
            ));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        Ok(())
    }
}

/// File system locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Folder holding one exported wiki page per gear tier
    #[serde(default = "defaults::input_dir")]
    pub input_dir: PathBuf,

    /// Folder receiving the exported JSON documents
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Folder backing the gear-set row store
    #[serde(default = "defaults::store_dir")]
    pub store_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: defaults::input_dir(),
            output_dir: defaults::output_dir(),
            store_dir: defaults::store_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Markup conventions of the source wiki.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Token marking an excellent-quality item or row
    #[serde(default = "defaults::excellence_marker")]
    pub excellence_marker: String,

    /// Separator inside class-list cells and multi-variant item cells
    #[serde(default = "defaults::class_separator")]
    pub class_separator: String,

    /// Cell content meaning "no value"
    #[serde(default = "defaults::placeholder")]
    pub placeholder: String,

    /// Drop percent signs before reading numbers
    #[serde(default = "defaults::strip_percent")]
    pub strip_percent: bool,

    /// Known class identifiers, in canonical spelling
    #[serde(default = "defaults::classes")]
    pub classes: Vec<String>,

    /// Class groups assigned to armor item columns when the header names none
    #[serde(default = "defaults::default_class_groups")]
    pub default_class_groups: Vec<Vec<String>>,

    /// Suffix the wiki appends to page titles (e.g. " - Eterspire Wiki")
    #[serde(default = "defaults::site_suffix")]
    pub site_suffix: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            excellence_marker: defaults::excellence_marker(),
            class_separator: defaults::class_separator(),
            placeholder: defaults::placeholder(),
            strip_percent: defaults::strip_percent(),
            classes: defaults::classes(),
            default_class_groups: defaults::default_class_groups(),
            site_suffix: defaults::site_suffix(),
        }
    }
}

/// File watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Minimum time between two pipeline runs
    #[serde(default = "defaults::debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::debounce_ms(),
        }
    }
}

/// Wiki download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Page URL prefix; the page title is appended
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Path defaults
    pub fn input_dir() -> PathBuf {
        PathBuf::from("manual-download")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }
    pub fn store_dir() -> PathBuf {
        PathBuf::from("store")
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // Extraction defaults
    pub fn excellence_marker() -> String {
        "Ex.".into()
    }
    pub fn class_separator() -> String {
        "/".into()
    }
    pub fn placeholder() -> String {
        "-".into()
    }
    pub fn strip_percent() -> bool {
        true
    }
    pub fn classes() -> Vec<String> {
        vec![
            "Guardian".into(),
            "Warrior".into(),
            "Rogue".into(),
            "Sorcerer".into(),
        ]
    }
    pub fn default_class_groups() -> Vec<Vec<String>> {
        vec![
            vec!["Guardian".into(), "Warrior".into(), "Rogue".into()],
            vec!["Sorcerer".into()],
        ]
    }
    pub fn site_suffix() -> String {
        " - Eterspire Wiki".into()
    }

    pub fn debounce_ms() -> u64 {
        2000
    }

    // Fetch defaults
    pub fn base_url() -> String {
        "https://eterspire.wiki/index.php/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; wikigear/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_marker() {
        let mut config = Config::default();
        config.extraction.excellence_marker = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_default_class() {
        let mut config = Config::default();
        config.extraction.default_class_groups = vec![vec!["Bard".to_string()]];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_base_url_without_slash() {
        let mut config = Config::default();
        config.fetch.base_url = "https://eterspire.wiki/index.php".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            input_dir = "pages"

            [lookup.tiers]
            Bronze = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.input_dir, PathBuf::from("pages"));
        assert_eq!(config.paths.output_dir, PathBuf::from("output"));
        assert_eq!(config.extraction.excellence_marker, "Ex.");
        assert_eq!(config.lookup.tiers.len(), 1);
        assert!(!config.lookup.slots.is_empty());
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[watch]\ndebounce_ms = 500\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.watch.debounce_ms, 500);
        assert_eq!(config.logging.level, "info");

        assert!(Config::load(dir.path().join("missing.toml")).is_err());
    }
}
