//! Configuration management with YAML support

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub lint: LintConfig,
}

/// Database locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Metrics store (performance history)
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Database the scored queries run against
    #[serde(default = "default_target_path")]
    pub target_path: String,
}

/// Dynamic threshold parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// How many recent samples are compared against the query
    #[serde(default = "default_sample_limit")]
    pub similarity_scan_limit: usize,

    /// Sample window when no query is given
    #[serde(default = "default_sample_limit")]
    pub window_size: usize,

    #[serde(default = "default_percentile")]
    pub percentile: f64,

    #[serde(default = "default_fallback_execution_time")]
    pub fallback_execution_time: f64,

    #[serde(default = "default_fallback_cpu_usage")]
    pub fallback_cpu_usage: f64,
}

/// Sample retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// `null` keeps every sample
    #[serde(default = "default_max_samples")]
    pub max_samples: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

// Default value functions
fn default_metrics_path() -> String {
    "~/.local/share/sqlscore/metrics.db".to_string()
}

fn default_target_path() -> String {
    "test.db".to_string()
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_sample_limit() -> usize {
    100
}

fn default_percentile() -> f64 {
    95.0
}

fn default_fallback_execution_time() -> f64 {
    1.0
}

fn default_fallback_cpu_usage() -> f64 {
    100.0
}

fn default_max_samples() -> Option<usize> {
    Some(10_000)
}

fn default_max_line_length() -> usize {
    80
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            metrics_path: default_metrics_path(),
            target_path: default_target_path(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            similarity_scan_limit: default_sample_limit(),
            window_size: default_sample_limit(),
            percentile: default_percentile(),
            fallback_execution_time: default_fallback_execution_time(),
            fallback_cpu_usage: default_fallback_cpu_usage(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
        }
    }
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./sqlscore.yaml (current directory)
    /// 3. ~/.config/sqlscore/sqlscore.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "sqlscore.yaml".to_string(),
            shellexpand::tilde("~/.config/sqlscore/sqlscore.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Metrics database path, expanding ~ to home directory
    pub fn metrics_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.metrics_path).to_string())
    }

    /// Target database path, expanding ~ to home directory
    pub fn target_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.target_path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring.similarity_threshold, 0.8);
        assert_eq!(config.scoring.window_size, 100);
        assert_eq!(config.scoring.fallback_execution_time, 1.0);
        assert_eq!(config.scoring.fallback_cpu_usage, 100.0);
        assert_eq!(config.retention.max_samples, Some(10_000));
        assert_eq!(config.lint.max_line_length, 80);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
database:
  metrics_path: /tmp/sqlscore/metrics.db

scoring:
  similarity_threshold: 0.9
  percentile: 90

retention:
  max_samples: null
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.metrics_path, "/tmp/sqlscore/metrics.db");
        assert_eq!(config.database.target_path, "test.db");
        assert_eq!(config.scoring.similarity_threshold, 0.9);
        assert_eq!(config.scoring.percentile, 90.0);
        assert_eq!(config.scoring.similarity_scan_limit, 100);
        assert_eq!(config.retention.max_samples, None);
        assert_eq!(config.metrics_path(), PathBuf::from("/tmp/sqlscore/metrics.db"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let config = Config::load(missing.to_str().unwrap()).unwrap();
        assert_eq!(config.scoring.percentile, 95.0);
    }
}
