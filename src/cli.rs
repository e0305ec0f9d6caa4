//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{PipelineConfig, SummaryScope};

/// Vulnerability scanning with semantic context for Android Java apps
#[derive(Parser, Debug)]
#[command(name = "vulnlens")]
#[command(about = "Scan an Android app, map findings to methods, classes and clusters, and summarize them")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format for the run summary
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to <config_dir>/vulnlens/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: scan, parse, cluster, summarize, report
    Run(RunArgs),

    /// Rebuild results.json from an existing output directory
    Report {
        /// Directory holding the pipeline outputs
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Android app source directory
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Run the scanner on the app directory
    #[arg(long, conflicts_with = "scan_output", required_unless_present = "scan_output")]
    pub scan: bool,

    /// Use an existing scanner report instead of scanning
    #[arg(long, value_name = "FILE")]
    pub scan_output: Option<PathBuf>,

    /// Directory for all pipeline outputs
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Skip the model summaries; the report carries placeholders
    #[arg(long)]
    pub no_summarize: bool,

    /// Which methods and classes get summaries
    #[arg(long, value_enum)]
    pub summary_scope: Option<SummaryScope>,

    #[command(flatten)]
    pub models: ModelArgs,
}

/// Model endpoint overrides
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// Chat completions endpoint
    #[arg(long, env = "VULNLENS_CHAT_ENDPOINT")]
    pub chat_endpoint: Option<String>,

    /// Chat model name
    #[arg(long, env = "VULNLENS_CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Embeddings endpoint
    #[arg(long, env = "VULNLENS_EMBED_ENDPOINT")]
    pub embed_endpoint: Option<String>,

    /// Embedding model name
    #[arg(long, env = "VULNLENS_EMBED_MODEL")]
    pub embed_model: Option<String>,

    /// Bearer token for both endpoints
    #[arg(long, env = "VULNLENS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text summary
    #[default]
    Text,
    /// JSON statistics
    Json,
}

impl RunArgs {
    /// Layer flag and environment values over the loaded configuration
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(scope) = self.summary_scope {
            config.summaries.scope = scope;
        }
        let models = &mut config.models;
        if let Some(v) = &self.models.chat_endpoint {
            models.chat_endpoint = v.clone();
        }
        if let Some(v) = &self.models.chat_model {
            models.chat_model = v.clone();
        }
        if let Some(v) = &self.models.embed_endpoint {
            models.embedding_endpoint = v.clone();
        }
        if let Some(v) = &self.models.embed_model {
            models.embedding_model = v.clone();
        }
        if let Some(v) = &self.models.api_key {
            models.api_key = Some(v.clone());
        }
    }
}
