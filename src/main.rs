//! vulnlens CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vulnlens::cli::{Commands, RunArgs};
use vulnlens::{
    generate_results, ChatSummarizer, Cli, EmbeddingClusterer, HttpEmbedder, JavaParser, MobsfScanner, OutputFormat,
    OutputStore, Pipeline, PipelineConfig, ReportStats, RunStats, ScanSource, VulnLensError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Logs go to stderr so stdout carries only the run summary
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> vulnlens::Result<String> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            args.apply_overrides(&mut config);
            config.validate()?;
            run_pipeline(&args, config, cli.format).await
        }
        Commands::Report { output_dir } => {
            let store = OutputStore::new(output_dir);
            let document = generate_results(&store, &config.scanner)?;
            let stats = ReportStats::from_document(&document);
            render(&stats, cli.format, ReportStats::render_text)
        }
    }
}

async fn run_pipeline(args: &RunArgs, config: PipelineConfig, format: OutputFormat) -> vulnlens::Result<String> {
    if !args.dir.is_dir() {
        return Err(VulnLensError::FileNotFound {
            path: args.dir.display().to_string(),
        });
    }
    let scan_source = match &args.scan_output {
        Some(path) => ScanSource::Existing(path.clone()),
        None => ScanSource::Run,
    };

    let embedder = HttpEmbedder::new(&config.models)?;
    let summarizer = if args.no_summarize {
        None
    } else {
        Some(ChatSummarizer::new(&config.models)?)
    };

    let pipeline = Pipeline {
        scanner: MobsfScanner::new(config.scanner.clone(), &args.output_dir),
        parser: JavaParser::new(),
        clusterer: EmbeddingClusterer::new(
            embedder,
            config.clustering.clone(),
            config.models.embedding_batch_size,
        ),
        summarizer,
        store: OutputStore::new(&args.output_dir),
        config,
    };

    let stats = pipeline.run(&args.dir, &scan_source).await?;
    render(&stats, format, RunStats::render_text)
}

fn render<T: serde::Serialize>(value: &T, format: OutputFormat, text: impl Fn(&T) -> String) -> vulnlens::Result<String> {
    match format {
        OutputFormat::Text => Ok(text(value).trim_end().to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| VulnLensError::json("run summary", e))
        }
    }
}
