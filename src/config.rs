//! Pipeline configuration
//!
//! Values come from three layers, later layers winning:
//! 1. built-in defaults
//! 2. a TOML file (`--config`, else `<config_dir>/vulnlens/config.toml` if present)
//! 3. CLI flags and `VULNLENS_*` environment variables (see `cli.rs`)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VulnLensError};

/// Which methods and classes get a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SummaryScope {
    /// Only methods and classes that contain a finding
    #[default]
    Vulnerable,
    /// Every parsed method and class
    All,
}

/// Complete configuration for a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub models: ModelConfig,
    pub clustering: ClusterConfig,
    pub summaries: SummaryConfig,
    pub scanner: ScannerConfig,
}

/// Endpoints and request policy for the embedding and chat services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// OpenAI-compatible chat completions endpoint
    pub chat_endpoint: String,
    pub chat_model: String,
    /// OpenAI-compatible embeddings endpoint
    pub embedding_endpoint: String,
    pub embedding_model: String,
    /// Bearer token sent to both endpoints, if set
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries
    pub retry_backoff_ms: u64,
    pub max_concurrent_requests: usize,
    /// Texts per embeddings request
    pub embedding_batch_size: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            chat_model: "codellama:7b-instruct".to_string(),
            embedding_endpoint: "http://localhost:11434/v1/embeddings".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            timeout_seconds: 120,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_concurrent_requests: 4,
            embedding_batch_size: 16,
            temperature: 0.1,
            max_tokens: 150,
        }
    }
}

/// k-means and k-selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub min_k: usize,
    pub max_k: usize,
    pub max_iterations: usize,
    /// Maximum characters of class code sent to the embedder
    pub max_embed_chars: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_k: 2,
            max_k: 15,
            max_iterations: 300,
            max_embed_chars: 8000,
        }
    }
}

/// Prompt shaping for the summarizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub scope: SummaryScope,
    pub max_method_chars: usize,
    pub max_class_chars: usize,
    /// Classes whose code is sampled into a cluster prompt
    pub cluster_sample_classes: usize,
    pub cluster_sample_chars: usize,
    /// Names listed per context line (calls, references, members)
    pub max_context_names: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            scope: SummaryScope::Vulnerable,
            max_method_chars: 4000,
            max_class_chars: 2000,
            cluster_sample_classes: 3,
            cluster_sample_chars: 500,
            max_context_names: 10,
        }
    }
}

/// Scanner invocation and filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub command: String,
    /// Rule ids dropped from the scan report
    pub skip_rules: Vec<String>,
    /// File extensions kept in the scan report
    pub extensions: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: "mobsfscan".to_string(),
            skip_rules: vec!["hardcoded_secret".to_string()],
            extensions: vec!["java".to_string()],
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an explicit file, the default location, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(VulnLensError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            VulnLensError::Config { message } => VulnLensError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Parse TOML text; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VulnLensError::Config {
            message: e.to_string(),
        })
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(VulnLensError::Config { message });

        if self.clustering.min_k < 2 {
            return fail(format!("clustering.min_k must be at least 2, got {}", self.clustering.min_k));
        }
        if self.clustering.min_k > self.clustering.max_k {
            return fail(format!(
                "clustering.min_k ({}) exceeds clustering.max_k ({})",
                self.clustering.min_k, self.clustering.max_k
            ));
        }
        if self.clustering.max_iterations == 0 {
            return fail("clustering.max_iterations must be positive".to_string());
        }
        if self.models.max_concurrent_requests == 0 {
            return fail("models.max_concurrent_requests must be positive".to_string());
        }
        if self.models.embedding_batch_size == 0 {
            return fail("models.embedding_batch_size must be positive".to_string());
        }
        if self.models.chat_endpoint.trim().is_empty() {
            return fail("models.chat_endpoint is empty".to_string());
        }
        if self.models.embedding_endpoint.trim().is_empty() {
            return fail("models.embedding_endpoint is empty".to_string());
        }
        Ok(())
    }
}

/// `<config_dir>/vulnlens/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vulnlens").join("config.toml"))
}
