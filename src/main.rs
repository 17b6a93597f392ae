//! Crickstat - multi-source cricket statistics with LLM analysis
//!
//! A CLI tool and HTTP API that collects player statistics from several
//! public sources concurrently, substitutes fallback data for sources
//! that fail, and asks a language model for a natural-language analysis.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, cancelled request, analysis backend failure)
//!   2 - Insufficient data (no source returned statistics)

mod analyzer;
mod chat;
mod cli;
mod config;
mod coordinator;
mod error;
mod fallback;
mod models;
mod query;
mod report;
mod server;
mod service;
mod sources;
mod tools;

#[cfg(test)]
mod testing;

use analyzer::{build_backend, Analyzer};
use anyhow::{Context, Result};
use cli::{AnalysisOptions, Args, Command, OutputFormat, OutputOptions};
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Focus, Query};
use service::{AnalysisOutcome, CricketService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_INSUFFICIENT_DATA: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // .env may provide GOOGLE_API_KEY and CRICKSTAT_MODEL for clap
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("Crickstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {}", config_source);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            interrupt.cancel();
        }
    });

    match run(args, config, cancel).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Request failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Handle init-config: generate a default .crickstat.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(EXIT_FAILURE);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the model, data sources, and server.");
    println!("   The API key is read from GOOGLE_API_KEY, never from this file.");
    Ok(())
}

/// Initialize logging: RUST_LOG wins, then -v/-q, then the config file.
fn init_logging(args: &Args, config: &Config) {
    let directive = if args.verbose || args.quiet {
        args.log_level().to_string().to_lowercase()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("loaded from {}", config_path.display())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, format!("loaded from {}", DEFAULT_CONFIG_FILE))),
        Ok(None) => Ok((Config::default(), "no config file found, using defaults".to_string())),
        Err(e) => Ok((
            Config::default(),
            format!("failed to load {} ({:#}), using defaults", DEFAULT_CONFIG_FILE, e),
        )),
    }
}

/// Run the selected command. Returns the exit code.
async fn run(args: Args, config: Config, cancel: CancellationToken) -> Result<i32> {
    let service = CricketService::from_config(&config)?;

    match &args.command {
        Command::Analyze { player, options } => {
            let format = options.format.unwrap_or(config.general.default_format);
            let query = Query::new(player, format)?;
            if options.dry_run {
                return dry_run(&service, &[query], options, &cancel).await;
            }

            let service = with_analyzer(service, &config, &args)?;
            println!("🏏 Analyzing {} ({} focus)", query, options.focus);

            let pb = spinner("Querying data sources and analyzing...", args.quiet);
            let analysis = service.analyze_player(&query, options.focus, &cancel).await;
            pb.finish_and_clear();
            let analysis = analysis?;

            let content = match options.output.report_format {
                OutputFormat::Json => report::generate_json_report(&analysis)?,
                OutputFormat::Markdown => report::generate_markdown_analysis(&analysis),
            };
            emit(&content, &options.output)?;
            Ok(exit_code(&analysis.outcome))
        }

        Command::Compare {
            player1,
            player2,
            options,
        } => {
            let format = options.format.unwrap_or(config.general.default_format);
            if options.dry_run {
                let queries = [Query::new(player1, format)?, Query::new(player2, format)?];
                return dry_run(&service, &queries, options, &cancel).await;
            }

            let service = with_analyzer(service, &config, &args)?;
            println!("⚖️ Comparing {} vs {} ({})", player1, player2, format);

            let pb = spinner("Querying data sources for both players...", args.quiet);
            let comparison = service
                .compare_players(player1, player2, format, options.focus, &cancel)
                .await;
            pb.finish_and_clear();
            let comparison = comparison?;

            let content = match options.output.report_format {
                OutputFormat::Json => report::generate_json_report(&comparison)?,
                OutputFormat::Markdown => report::generate_markdown_comparison(&comparison),
            };
            emit(&content, &options.output)?;
            Ok(exit_code(&comparison.outcome))
        }

        Command::Ask { query, output } => {
            let text = query.join(" ");
            let service = with_analyzer(service, &config, &args)?;

            let pb = spinner("Answering...", args.quiet);
            let answer = service.ask(&text, &cancel).await;
            pb.finish_and_clear();
            let answer = answer?;

            let content = match output.report_format {
                OutputFormat::Json => report::generate_json_report(&answer)?,
                OutputFormat::Markdown => report::generate_markdown_answer(&answer),
            };
            emit(&content, output)?;
            Ok(exit_code(answer.outcome()))
        }

        Command::Chat => {
            let service = with_analyzer(service, &config, &args)?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat::run_session(&service, stdin, tokio::io::stdout(), &cancel).await?;
            Ok(EXIT_SUCCESS)
        }

        Command::Stats {
            player,
            format,
            output,
        } => {
            let query = Query::new(player, format.unwrap_or(config.general.default_format))?;

            let pb = spinner("Querying data sources...", args.quiet);
            let report = service.collect(&query, &cancel).await;
            pb.finish_and_clear();
            let report = report?;

            let content = match output.report_format {
                OutputFormat::Json => report::generate_json_report(&report)?,
                OutputFormat::Markdown => report::generate_stats_report(&report),
            };
            emit(&content, output)?;
            Ok(if report.has_data() {
                EXIT_SUCCESS
            } else {
                EXIT_INSUFFICIENT_DATA
            })
        }

        Command::Tool { name, args: raw, list } => {
            if *list {
                println!(
                    "{}",
                    report::generate_json_report(&tools::get_tool_definitions())?
                );
                return Ok(EXIT_SUCCESS);
            }

            let name = name.as_deref().unwrap_or_default();
            let tool_args: serde_json::Value =
                serde_json::from_str(raw).context("Invalid --args JSON")?;
            let result = tools::ToolExecutor::new(service)
                .execute(name, &tool_args, &cancel)
                .await;

            println!("{}", report::generate_json_report(&result)?);
            Ok(if result.success {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            })
        }

        Command::Serve { bind } => {
            let service = match build_backend(&config.model, args.api_key.clone()) {
                Ok(backend) => service.with_analyzer(Analyzer::new(Arc::from(backend))),
                Err(e) => {
                    warn!("Analysis endpoints disabled: {}", e);
                    service
                }
            };

            let bind = bind.clone().unwrap_or_else(|| config.server.bind.clone());
            let state = server::AppState::new(
                service,
                cancel,
                Duration::from_secs(config.server.request_timeout_seconds),
            );

            println!("🌐 Serving on http://{} (Ctrl-C to stop)", bind);
            server::serve(state, &bind).await?;
            Ok(EXIT_SUCCESS)
        }

        Command::InitConfig => {
            handle_init_config()?;
            Ok(EXIT_SUCCESS)
        }
    }
}

/// Attach the configured analysis backend. Fails before any network call
/// when the backend cannot be configured.
fn with_analyzer(service: CricketService, config: &Config, args: &Args) -> Result<CricketService> {
    let backend = build_backend(&config.model, args.api_key.clone())?;
    info!(
        "Using {} model {}",
        config.model.provider,
        backend.model_name()
    );
    Ok(service.with_analyzer(Analyzer::new(Arc::from(backend))))
}

/// Handle --dry-run: collect statistics and print the prompt without
/// calling the language model.
async fn dry_run(
    service: &CricketService,
    queries: &[Query],
    options: &AnalysisOptions,
    cancel: &CancellationToken,
) -> Result<i32> {
    println!("\n🔍 Dry run: collecting statistics (no LLM call)...\n");

    let mut reports = Vec::with_capacity(queries.len());
    for query in queries {
        let report = service.collect(query, cancel).await?;
        println!("### {}\n", query);
        println!("{}", report::status_section(&report));
        reports.push(report);
    }

    let focus: Focus = options.focus;
    let prompt = match reports.as_slice() {
        [report] => analyzer::prompt::analysis_prompt(report.query(), report, focus),
        [first, second] => analyzer::prompt::comparison_prompt(first, second, focus),
        _ => String::new(),
    };

    if reports.iter().any(|r| !r.has_data()) {
        println!("⚠️  Insufficient data: the model would not be called.");
        return Ok(EXIT_INSUFFICIENT_DATA);
    }

    println!("📝 Prompt that would be sent:\n");
    println!("{}", prompt);
    println!("\n✅ Dry run complete. No LLM calls were made.");
    Ok(EXIT_SUCCESS)
}

fn spinner(message: &'static str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Print the report, or save it when an output file was given.
fn emit(content: &str, output: &OutputOptions) -> Result<()> {
    match &output.output {
        Some(path) => {
            report::write_report(content, path)?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn exit_code(outcome: &AnalysisOutcome) -> i32 {
    match outcome {
        AnalysisOutcome::Completed(_) => EXIT_SUCCESS,
        AnalysisOutcome::InsufficientData(_) => EXIT_INSUFFICIENT_DATA,
        AnalysisOutcome::Failed { .. } => {
            eprintln!("\n❌ Analysis failed: {}", outcome.text());
            EXIT_FAILURE
        }
    }
}
