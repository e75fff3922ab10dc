use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartstream_advisor::input::RawLog;
use smartstream_advisor::pipeline::{AdvisorPipeline, RunOptions};
use smartstream_core::{
    Backend, OutputFormat, SmartstreamConfig, SmartstreamError, TruncationDirection,
    DEFAULT_CONFIG_FILE,
};

#[derive(Parser)]
#[command(
    name = "smartstream",
    version,
    about = "Send a failing Jenkins build log to an LLM and surface the suggested fix",
    long_about = "SmartStream reads a failing Jenkins build log, asks a language model for 2-3\n\
                   possible fixes, saves the answer next to the build, and alerts Slack when\n\
                   the model could not identify the problem.\n\n\
                   Examples:\n  \
                     smartstream build.log                  Analyze a saved console log\n  \
                     curl -s $BUILD_URL/consoleText | smartstream   Analyze from stdin\n  \
                     smartstream --backend endpoint build.log       Use a SageMaker endpoint\n  \
                     smartstream init                       Create a .smartstream.toml",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Build log to analyze (default: read stdin)
    log_file: Option<PathBuf>,

    /// Path to configuration file (default: .smartstream.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Suggestion backend: chat or endpoint
    #[arg(long)]
    backend: Option<Backend>,

    /// Maximum log characters sent to the model (default: 4000)
    #[arg(long)]
    max_chars: Option<usize>,

    /// Which end of an oversized log to keep: head or tail
    #[arg(long)]
    direction: Option<TruncationDirection>,

    /// Output format
    #[arg(
        long,
        default_value = "text",
        long_help = "Output format for the suggestion.\n\n\
                       Formats:\n  \
                         text      Framed suggestion with a summary line (default)\n  \
                         json      Machine-readable analysis report with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Do not write the suggestion files
    #[arg(long)]
    no_files: bool,

    /// Never send a Slack alert
    #[arg(long)]
    no_notify: bool,

    /// Keep emoji in the saved suggestion files
    #[arg(long)]
    keep_emoji: bool,

    /// Enable debug logging on stderr
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create a default .smartstream.toml configuration file
    #[command(long_about = "Create a default .smartstream.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .smartstream.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r##"# SmartStream Configuration
# Environment variables override these values; CLI flags override both.

# Suggestion backend: "chat" (OpenAI-compatible) or "endpoint" (SageMaker)
# backend = "chat"

[llm]
# Prefer OPENAI_API_KEY over storing the key here.
# model = "gpt-4"
# base_url = "https://api.openai.com"
# max_tokens = 400
# temperature = 0.4
# timeout_secs = 60

[endpoint]
# name = "log-analyzer-endpoint"
# region = "us-east-1"
# url = "http://localhost:8080/invocations"
# timeout_secs = 60

[input]
# max_chars = 4000
# direction = "tail"

[output]
# write_files = true
# full_file = "ai_suggestion.txt"
# filtered_file = "ai_suggestion_filtered.txt"
# strip_emoji = true

[slack]
# Prefer SLACK_BOT_TOKEN over storing the token here.
# channel = "#devops-alerts"
# excerpt_chars = 500
# rich = true
# timeout_secs = 30
"##;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "smartstream=debug,smartstream_advisor=debug,smartstream_core=debug"
    } else {
        "smartstream=info,smartstream_advisor=info,smartstream_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<SmartstreamConfig> {
    let mut config = SmartstreamConfig::discover(cli.config.as_deref(), Path::new("."))?;
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(max_chars) = cli.max_chars {
        config.input.max_chars = max_chars;
    }
    if let Some(direction) = cli.direction {
        config.input.direction = direction;
    }
    if cli.keep_emoji {
        config.output.strip_emoji = false;
    }

    config.validate()?;
    Ok(config)
}

fn read_log(file: Option<&Path>) -> Result<RawLog> {
    match file {
        Some(path) => Ok(RawLog::from_file(path)?),
        None => {
            let stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(SmartstreamError::Input(
                    "no log file given and stdin is a terminal".into(),
                )
                .into());
            }
            Ok(RawLog::from_reader(stdin.lock())?)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    // Usage errors exit 1 like any other input error; help and version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    init_tracing(cli.verbose);

    match cli.command {
        Some(Command::Init) => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                miette::bail!("{DEFAULT_CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {DEFAULT_CONFIG_FILE} with default configuration");
            return Ok(());
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "smartstream", &mut std::io::stdout());
            return Ok(());
        }
        None => {}
    }

    // Configuration problems are reported before any input is consumed.
    let config = load_config(&cli)?;
    let log = read_log(cli.log_file.as_deref())?;
    tracing::debug!(source = %log.source, chars = log.char_count(), "log loaded");

    let pipeline = AdvisorPipeline::from_config(&config)?;
    let options = RunOptions {
        write_files: config.output.write_files && !cli.no_files,
        notify: !cli.no_notify,
        ..RunOptions::default()
    };

    let spinner = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
            pb.set_style(style);
        }
        pb.set_message(format!("Asking {} backend for a fix...", config.backend));
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let analysis = pipeline.run(&log, &options).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match cli.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&analysis).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => print!("{}", analysis.to_markdown()),
        OutputFormat::Text => print!("{analysis}"),
    }

    Ok(())
}
