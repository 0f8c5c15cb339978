// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::image_optimizer::{
    ImageError, OptimizationPolicy, Optimizer, RasterPipeline, SourceLimits,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base policy; per-run overrides are merged over it
    #[serde(default)]
    pub policy: OptimizationPolicy,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub limits: SourceLimits,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Concurrency settings for batch optimization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Per-image timeout in milliseconds (unset: no timeout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Maximum images processed at once (unset: all at once)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable (default)
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_fallback_to_original() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Root directory for the directory uploader (default: uploads)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Upload the original files when optimization fails (default: true)
    #[serde(default = "default_fallback_to_original")]
    pub fallback_to_original: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            fallback_to_original: default_fallback_to_original(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.policy.validate().map_err(|e| e.to_string())?;

        if self.batch.timeout_ms == Some(0) {
            return Err("batch.timeout_ms must be greater than 0".to_string());
        }
        if self.batch.max_in_flight == Some(0) {
            return Err("batch.max_in_flight must be greater than 0".to_string());
        }

        if self.limits.max_source_file_size == 0 {
            return Err("limits.max_source_file_size must be greater than 0".to_string());
        }
        if self.limits.max_source_pixels == 0 {
            return Err("limits.max_source_pixels must be greater than 0".to_string());
        }

        if self.logging.level.trim().is_empty() {
            return Err("logging.level cannot be empty".to_string());
        }

        if self.upload.output_dir.as_os_str().is_empty() {
            return Err("upload.output_dir cannot be empty".to_string());
        }

        Ok(())
    }

    /// Build an optimizer from the policy, limits and batch settings
    pub fn optimizer(&self) -> Result<Optimizer, ImageError> {
        let mut optimizer = Optimizer::new(self.policy)?
            .with_processor(Arc::new(RasterPipeline::new(self.limits)));

        if let Some(ms) = self.batch.timeout_ms {
            optimizer = optimizer.with_timeout(Duration::from_millis(ms));
        }
        if let Some(max) = self.batch.max_in_flight {
            optimizer = optimizer.with_max_in_flight(max);
        }

        Ok(optimizer)
    }
}
