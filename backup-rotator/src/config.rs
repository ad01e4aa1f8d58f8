//! Configuration management for the retention engine.
//!
//! Loads configuration from a TOML file; CLI flags override file values.
//! Everything the orchestrator needs is passed in explicitly at
//! construction, so this is the only place defaults live.

use crate::utils::errors::{Result, RotatorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory all archives are written to.
    pub destination_root: PathBuf,

    /// Newest archives kept per source.
    #[serde(default = "default_max_archives")]
    pub max_archives_per_source: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Simulate the run without touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,

    /// Abort archive creation after this many seconds (0 = no limit).
    #[serde(default)]
    pub creation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Entries matching these patterns are left out of archives.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Gzip compression level (0-9).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_max_archives() -> usize {
    7
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        ".git".to_string(),
        "node_modules".to_string(),
        ".DS_Store".to_string(),
    ]
}

fn default_compression_level() -> u32 {
    6
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
            compression_level: default_compression_level(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                destination_root: PathBuf::from("backups"),
                max_archives_per_source: default_max_archives(),
            },
            run: RunConfig::default(),
            archive: ArchiveConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with. Called again after CLI
    /// overrides are applied.
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_archives_per_source == 0 {
            return Err(RotatorError::Config(
                "storage.max_archives_per_source must be at least 1".into(),
            ));
        }
        if self.archive.compression_level > 9 {
            return Err(RotatorError::Config(
                "archive.compression_level must be between 0 and 9".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            destination_root = "/var/backups"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.destination_root, PathBuf::from("/var/backups"));
        assert_eq!(config.storage.max_archives_per_source, 7);
        assert!(!config.run.dry_run);
        assert_eq!(config.run.creation_timeout_secs, 0);
        assert_eq!(config.archive.compression_level, 6);
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_retention_window_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            destination_root = "/var/backups"
            max_archives_per_source = 0
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(RotatorError::Config(_))
        ));
    }

    #[test]
    fn full_toml_round_trips_values() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            destination_root = "/srv/archives"
            max_archives_per_source = 14

            [run]
            dry_run = true
            creation_timeout_secs = 600

            [archive]
            exclude_patterns = [".cache"]
            compression_level = 9

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.max_archives_per_source, 14);
        assert!(config.run.dry_run);
        assert_eq!(config.run.creation_timeout_secs, 600);
        assert_eq!(config.archive.exclude_patterns, vec![".cache".to_string()]);
        assert_eq!(config.archive.compression_level, 9);
        assert_eq!(config.log.level, "debug");
    }
}
