use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gcies_nlp::EntityTextFilter;
use gcies_resolver::{GciesConfig, PipelineContext, ResolutionPipeline, ResolveError, SourceKind};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use tokio::runtime::Runtime;

/// Exit code for "no such place" and unusable input.
const EXIT_NOT_FOUND: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "gcies",
    version,
    about = "Resolve place names and extract geo-cultural insights"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Append JSON log records to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Include debug records.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolves a place and prints its insights as JSON.
    Resolve {
        /// Place name, optionally followed by comma-separated context.
        location: String,
        /// Source to resolve against (wikipedia, directory).
        #[arg(long, default_value = "wikipedia")]
        source: SourceKind,
        /// Directory page path; skips the search step.
        #[arg(long)]
        path: Option<String>,
    },
    /// Prints autocomplete suggestions, one per line.
    Suggest {
        /// Partial place name.
        query: String,
    },
    /// Prints the geo-cultural sentences of a text file.
    Filter {
        /// Plain-text input.
        file: PathBuf,
        /// Overrides `filter.max_sentences`.
        #[arg(long)]
        max_sentences: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            if code == EXIT_NOT_FOUND {
                eprintln!("{err}");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let logger = open_logger(cli.log_file.as_deref(), cli.verbose)?;
    let ctx = PipelineContext::from_config(&config, Some(Arc::clone(&logger)))?;
    let runtime = Runtime::new().context("starting tokio runtime")?;

    let _ = logger.log(
        &LogRecord::new("gcies", LogLevel::Debug, "gcies.cli.start")
            .with_field("command", serde_json::json!(command_name(&cli.command))),
    );

    match cli.command {
        Commands::Resolve {
            location,
            source,
            path,
        } => {
            let pipeline = ResolutionPipeline::from_context(&ctx)?;
            let resolution =
                runtime.block_on(pipeline.resolve(&location, source, path.as_deref()))?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Commands::Suggest { query } => {
            let pipeline = ResolutionPipeline::from_context(&ctx)?;
            for suggestion in runtime.block_on(pipeline.suggest(&query))? {
                println!(
                    "{}\t{}\t{}",
                    suggestion.title, suggestion.description, suggestion.source
                );
            }
        }
        Commands::Filter {
            file,
            max_sentences,
        } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let filter = EntityTextFilter::new(max_sentences.unwrap_or(config.filter.max_sentences))
                .with_telemetry(ctx.nlp_telemetry("nlp.filter")?);
            let classifier = ctx.classifier();
            let filtered = runtime.block_on(filter.filter(&text, classifier.as_ref()))?;
            for sentence in filtered.sentences() {
                println!("{sentence}");
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GciesConfig> {
    match path {
        Some(path) => GciesConfig::load(path),
        None => Ok(GciesConfig::default()),
    }
}

fn open_logger(path: Option<&Path>, verbose: bool) -> Result<Arc<JsonLogger>> {
    let logger = match path {
        Some(path) => JsonLogger::new(path)
            .with_context(|| format!("opening log file {}", path.display()))?
            .with_min_level(LogLevel::Info),
        None => JsonLogger::stderr().with_min_level(LogLevel::Warn),
    };
    let logger = if verbose {
        logger.with_min_level(LogLevel::Debug)
    } else {
        logger
    };
    Ok(Arc::new(logger))
}

const fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Resolve { .. } => "resolve",
        Commands::Suggest { .. } => "suggest",
        Commands::Filter { .. } => "filter",
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ResolveError>() {
        Some(ResolveError::NotFound(_) | ResolveError::InvalidQuery(_)) => EXIT_NOT_FOUND,
        _ => 1,
    }
}
