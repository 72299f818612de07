//! Configuration management for the term deposit predictor

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable that overrides the configuration file path
pub const CONFIG_PATH_ENV: &str = "PREDICTOR_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locations of the offline-trained artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Fitted preprocessing transform (ONNX)
    pub preprocessor_path: PathBuf,
    /// Fitted binary classifier (ONNX)
    pub model_path: PathBuf,
    /// Text file holding the decision threshold
    #[serde(default)]
    pub threshold_path: Option<PathBuf>,
    /// Inline threshold, takes precedence over `threshold_path`
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Submission processing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of submissions evaluated concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Upper bound for a single evaluation in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_workers() -> usize {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Presentation template selection
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// One line: decision and probability
    Banner,
    /// Multi-line card with factors and financial health
    #[default]
    Card,
    /// Machine-readable report
    Json,
}

/// Presentation configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresentationConfig {
    #[serde(default)]
    pub template: TemplateKind,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `PREDICTOR_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// Values may be overridden with `PREDICTOR__SECTION__KEY` environment variables.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("PREDICTOR").separator("__"))
            .build()
            .with_context(|| {
                format!(
                    "Failed to build configuration from {}",
                    path.as_ref().display()
                )
            })?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactsConfig {
                preprocessor_path: PathBuf::from("artifacts/preprocessor.onnx"),
                model_path: PathBuf::from("artifacts/best_model.onnx"),
                threshold_path: Some(PathBuf::from("artifacts/best_threshold.txt")),
                threshold: None,
                onnx_threads: default_onnx_threads(),
            },
            pipeline: PipelineConfig::default(),
            presentation: PresentationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
