// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::Path;

use lingopost::app_config::{self, Config, TranslationProvider};
use lingopost::database::JobStatus;
use lingopost::translation::ProviderTranslator;
use lingopost::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for JobStatus to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliJobStatus {
    Pending,
    Processing,
    Completed,
    Published,
    Failed,
}

impl From<CliJobStatus> for JobStatus {
    fn from(status: CliJobStatus) -> Self {
        match status {
            CliJobStatus::Pending => JobStatus::Pending,
            CliJobStatus::Processing => JobStatus::Processing,
            CliJobStatus::Completed => JobStatus::Completed,
            CliJobStatus::Published => JobStatus::Published,
            CliJobStatus::Failed => JobStatus::Failed,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate content items and wait for the jobs to finish
    Translate(TranslateArgs),

    /// List jobs, newest first
    Jobs {
        /// Only show jobs with this status
        #[arg(long, value_enum)]
        status: Option<CliJobStatus>,

        /// Maximum number of jobs to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the log of a job
    Logs {
        /// Job identifier
        job_id: String,
    },

    /// Publish a completed job to the content source
    Publish {
        /// Job identifier
        job_id: String,
    },

    /// Delete a job and its log
    Delete {
        /// Job identifier
        job_id: String,
    },

    /// Show job counts and token usage
    Stats,

    /// Check that the configured provider is reachable
    Check,

    /// Generate shell completions for lingopost
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Content item ids (WordPress post ids)
    #[arg(value_name = "CONTENT_ID", required = true)]
    content_ids: Vec<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Keep finished translations unpublished
    #[arg(long)]
    no_publish: bool,
}

/// lingopost - scheduled AI translation of WordPress content
#[derive(Parser, Debug)]
#[command(name = "lingopost")]
#[command(version)]
#[command(about = "AI-powered content translation with a job scheduler")]
#[command(long_about = "lingopost fetches posts from a WordPress site, translates them with an AI provider and \
tracks every translation as a job with progress, token usage and logs.

EXAMPLES:
    lingopost translate 42 43                   # Translate two posts using default config
    lingopost translate -t de -p openai 42      # Translate into German with OpenAI
    lingopost jobs --status failed              # List failed jobs
    lingopost logs <JOB_ID>                     # Show the log of a job
    lingopost publish <JOB_ID>                  # Publish a completed job
    lingopost completions bash > lingopost.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "lingopost", &mut std::io::stdout());
        return Ok(());
    }

    let overrides = match &cli.command {
        Commands::Translate(args) => Some(args),
        _ => None,
    };
    let config = load_config(&cli.config_path, overrides, cli.log_level.clone())?;

    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    match cli.command {
        Commands::Translate(args) => run_translate(config, &args.content_ids).await,
        Commands::Jobs { status, limit } => list_jobs(config, status.map(Into::into), limit).await,
        Commands::Logs { job_id } => show_logs(config, &job_id).await,
        Commands::Publish { job_id } => publish_job(config, &job_id).await,
        Commands::Delete { job_id } => delete_job(config, &job_id).await,
        Commands::Stats => show_stats(config).await,
        Commands::Check => check_provider(config).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the configuration, creating a default file if missing, then apply CLI overrides
fn load_config(
    config_path: &str,
    options: Option<&TranslateArgs>,
    log_level: Option<CliLogLevel>,
) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config
            .save(config_path)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    if let Some(options) = options {
        if let Some(provider) = &options.provider {
            config.translation.provider = provider.clone().into();
        }

        if let Some(model) = &options.model {
            match config.translation.get_active_provider_config_mut() {
                Some(provider_config) => provider_config.model = model.clone(),
                None => warn!(
                    "No configuration for provider {}, ignoring --model",
                    config.translation.provider
                ),
            }
        }

        if let Some(source_lang) = &options.source_language {
            config.source_language = source_lang.clone();
        }

        if let Some(target_lang) = &options.target_language {
            config.target_language = target_lang.clone();
        }

        if options.no_publish {
            config.scheduler.auto_publish = false;
        }
    }

    if let Some(log_level) = log_level {
        config.log_level = log_level.into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_translate(config: Config, content_ids: &[String]) -> Result<()> {
    let controller = Controller::from_config(config)?;
    let jobs = controller.translate_with_progress(content_ids).await?;

    let mut failed = 0;
    for job in &jobs {
        match job.status {
            JobStatus::Failed => {
                failed += 1;
                error!(
                    "{} -> {}: failed: {}",
                    job.content_id,
                    job.target_language,
                    job.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            JobStatus::Published => info!(
                "{} -> {}: published as {} ({} tokens)",
                job.content_id,
                job.target_language,
                job.external_id.as_deref().unwrap_or("?"),
                job.tokens_used
            ),
            status => info!(
                "{} -> {}: {} ({} tokens)",
                job.content_id, job.target_language, status, job.tokens_used
            ),
        }
    }

    controller.shutdown().await;

    if failed > 0 {
        return Err(anyhow!("{} of {} job(s) failed", failed, jobs.len()));
    }
    Ok(())
}

async fn list_jobs(config: Config, status: Option<JobStatus>, limit: usize) -> Result<()> {
    let controller = Controller::from_config(config)?;
    let jobs = controller.list_jobs(status, limit).await?;

    if jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:<6}  {:<10}  {:>5}  {:>8}  UPDATED",
        "ID", "CONTENT", "LANG", "STATUS", "PROG", "TOKENS"
    );
    for job in jobs {
        println!(
            "{:<36}  {:<10}  {:<6}  {:<10}  {:>4}%  {:>8}  {}",
            job.id,
            job.content_id,
            job.target_language,
            job.status,
            job.progress,
            job.tokens_used,
            job.updated_at
        );
    }
    Ok(())
}

async fn show_logs(config: Config, job_id: &str) -> Result<()> {
    let controller = Controller::from_config(config)?;
    if controller.get_job(job_id).await?.is_none() {
        return Err(anyhow!("Job {} not found", job_id));
    }

    for entry in controller.job_logs(job_id).await? {
        match entry.metadata {
            Some(metadata) => println!("{} [{}] {} {}", entry.created_at, entry.level, entry.message, metadata),
            None => println!("{} [{}] {}", entry.created_at, entry.level, entry.message),
        }
    }
    Ok(())
}

async fn publish_job(config: Config, job_id: &str) -> Result<()> {
    let controller = Controller::from_config(config)?;
    let job = controller.publish_job(job_id).await?;
    info!(
        "Job {} published as {}",
        job.id,
        job.external_id.as_deref().unwrap_or("?")
    );
    Ok(())
}

async fn delete_job(config: Config, job_id: &str) -> Result<()> {
    let controller = Controller::from_config(config)?;
    if controller.delete_job(job_id).await? {
        Ok(())
    } else {
        Err(anyhow!("Job {} not found", job_id))
    }
}

async fn show_stats(config: Config) -> Result<()> {
    let controller = Controller::from_config(config)?;
    println!("{}", controller.stats().await?);
    Ok(())
}

async fn check_provider(config: Config) -> Result<()> {
    let translator = ProviderTranslator::from_config(&config.translation)?;
    info!(
        "Testing connection to {} with model {}",
        config.translation.provider.display_name(),
        config.translation.get_model()
    );
    translator
        .test_connection()
        .await
        .context("Provider connection test failed")?;
    info!("Connection OK");
    Ok(())
}
