//! Jimaku - chunked subtitle translation over an LLM generation endpoint
//!
//! Entry point for the `jimaku` command line tool.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jimaku::chunker::chunk;
use jimaku::cli::{Args, Commands, ConfigAction, TranslateFlags};
use jimaku::config::Config;
use jimaku::error::JimakuError;
use jimaku::subtitle::parse_with_report;
use jimaku::workflow::{read_subtitle_file, ChunkStatus, TranslateFileOptions, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("jimaku.toml").exists() {
                info!("Found jimaku.toml in current directory, loading...");
                Config::from_file("jimaku.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Translate { input, output, report, flags } => {
            let options = apply_translate_flags(&mut config, &flags, report)?;
            let workflow = Workflow::new(config)?;
            watch_for_interrupt(&workflow);

            let progress = ProgressBar::new(0);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({eta}) {msg}")?
                    .progress_chars("#>-"),
            );

            let (path, summary) = workflow
                .translate_file(&input, output.as_deref(), &options, |event| {
                    progress.set_length(event.total as u64);
                    if event.state.status == ChunkStatus::Running {
                        progress.set_message(format!("batch {}", event.index + 1));
                    } else {
                        progress.inc(1);
                    }
                })
                .await?;
            progress.finish_and_clear();

            println!(
                "Wrote {} ({} batches ok, {} failed{})",
                path.display(),
                summary.succeeded,
                summary.failed,
                if summary.cancelled { ", cancelled" } else { "" }
            );
        }
        Commands::Batch { input_dir, output_dir, report_dir, flags } => {
            let options = apply_translate_flags(&mut config, &flags, report_dir)?;
            let workflow = Workflow::new(config)?;
            watch_for_interrupt(&workflow);

            let written = workflow
                .translate_directory(&input_dir, output_dir.as_deref(), &options)
                .await?;
            println!("Translated {} files", written.len());
        }
        Commands::Analyze { input, output, source_lang, target_lang } => {
            if let Some(lang) = source_lang {
                config.translate.source_language = lang;
            }
            if let Some(lang) = target_lang {
                config.translate.target_language = lang;
            }

            let workflow = Workflow::new(config)?;
            let guide = workflow.analyze_file(&input).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &guide).await?;
                    println!("Wrote context guide to {}", path.display());
                }
                None => println!("{}", guide),
            }
        }
        Commands::Inspect { input, chunk_size } => {
            let chunk_size = chunk_size.unwrap_or(config.translate.chunk_size);
            if chunk_size == 0 {
                return Err(JimakuError::Config("chunk_size must be positive".to_string()).into());
            }

            let content = read_subtitle_file(&input).await?;
            let report = parse_with_report(&content);
            let batches = chunk(&report.records, chunk_size);

            println!("Records: {}", report.records.len());
            println!("Skipped lines: {}", report.skipped_lines);
            println!("Batches: {} (chunk size {})", batches.len(), chunk_size);
            println!("{:<8} {:<10} {:<10}", "Batch", "Records", "Chars");
            println!("{}", "-".repeat(30));
            for (i, batch) in batches.iter().enumerate() {
                println!("{:<8} {:<10} {:<10}", i + 1, batch.len(), batch.char_len());
            }

            if report.records.is_empty() {
                return Err(JimakuError::Parse(format!("no subtitle blocks in {}", input.display())).into());
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { output, force } => {
                if output.exists() && !force {
                    return Err(JimakuError::Config(format!(
                        "{} already exists (use --force to overwrite)",
                        output.display()
                    ))
                    .into());
                }
                Config::default().save_to_file(&output)?;
                println!("Wrote default configuration to {}", output.display());
            }
            ConfigAction::Show => {
                let mut shown = config.clone();
                if shown.generation.api_key.is_some() {
                    shown.generation.api_key = Some("********".to_string());
                }
                print!("{}", toml::to_string_pretty(&shown)?);
            }
        },
    }

    Ok(())
}

/// Fold command line overrides into the config and build per-file options
fn apply_translate_flags(
    config: &mut Config,
    flags: &TranslateFlags,
    report_path: Option<std::path::PathBuf>,
) -> Result<TranslateFileOptions> {
    if let Some(lang) = &flags.source_lang {
        config.translate.source_language = lang.clone();
    }
    if let Some(lang) = &flags.target_lang {
        config.translate.target_language = lang.clone();
    }
    if let Some(size) = flags.chunk_size {
        config.translate.chunk_size = size;
    }
    if flags.reasoning {
        config.translate.reasoning = true;
    }
    config.validate()?;

    let context_guide = match &flags.context {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };

    Ok(TranslateFileOptions {
        context_guide,
        analyze_context: flags.analyze,
        report_path,
        retry_failed: flags.retry_failed,
    })
}

/// Cancel at the next batch boundary on Ctrl-C; a second Ctrl-C exits immediately
fn watch_for_interrupt(workflow: &Workflow) {
    let handle = workflow.cancel_handle();
    tokio::spawn(async move {
        if handle.watch_interrupts(tokio::signal::ctrl_c).await {
            warn!("Second interrupt received, exiting");
            std::process::exit(130);
        }
    });
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".jimaku").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "jimaku.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("jimaku.log").display());

    Ok(())
}
