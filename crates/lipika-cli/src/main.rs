// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lipika — scanned images and PDFs in, structured DOCX documents out.
//
// Entry point. Initialises logging, loads the configuration, and runs either
// a single file or a whole batch through the recognition pipeline.

mod inputs;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lipika_core::config::default_config_path;
use lipika_core::error::{LipikaError, Result};
use lipika_core::human_errors::humanize_error;
use lipika_core::AppConfig;
use lipika_document::export::default_archive_name;
use lipika_document::{DocumentExporter, DocumentStructurer, output_name};
use lipika_ocr::{BatchOrchestrator, HttpRecognizer, Notice};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "lipika", version, about = "Turn scanned images and PDFs into DOCX documents")]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/lipika/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recognise one file and write one document.
    Single {
        file: PathBuf,
        /// Output document (defaults to the input name with a .docx extension).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Recognise many files (or directories of files) into one ZIP archive.
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output archive (defaults to lipika-batch-<timestamp>.zip).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the current configuration (defaults plus overrides) to the config file.
    InitConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            error!(error = %err, "{}", human.message);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = AppConfig::load(&config_path)?;
    info!(path = %config_path.display(), endpoint = %config.recognition.endpoint, "Lipika starting");

    match cli.command {
        Command::Single { file, output } => single(&config, file, output).await,
        Command::Batch { inputs, output } => batch(&config, inputs, output).await,
        Command::InitConfig => {
            config.save(&config_path)?;
            println!("Configuration written to {}", config_path.display());
            Ok(())
        }
    }
}

fn orchestrator(config: &AppConfig) -> Result<BatchOrchestrator<HttpRecognizer>> {
    let recognizer = HttpRecognizer::new(&config.recognition)?;
    let orchestrator = BatchOrchestrator::from_config(recognizer, config).with_notifier(|notice: Notice| {
        let page = notice.page.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        warn!(
            source = %notice.source_name,
            page = %page,
            outcome = ?notice.outcome,
            detail = %notice.detail,
            "{} {}",
            notice.human.message,
            notice.human.suggestion
        );
    });
    #[cfg(feature = "pdfium")]
    let orchestrator = orchestrator.with_rasterizer(lipika_document::PdfiumRasterizer::default());
    Ok(orchestrator)
}

async fn single(config: &AppConfig, file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let source = inputs::load_source(&file)?;
    let mut orchestrator = orchestrator(config)?;
    let report = orchestrator.recognize_single(&source).await?;

    let elements = DocumentStructurer::new().parse(&report.text);
    let path = output.unwrap_or_else(|| PathBuf::from(output_name(&source.name)));
    DocumentExporter::new(config.export.clone()).export_to_file(&elements, &report.text, &path)?;

    println!(
        "{}: {} page(s), {} failed -> {}",
        source.name,
        report.total_pages,
        report.failed_page_count(),
        path.display()
    );
    if !report.failed_pages().is_empty() {
        let pages: Vec<String> = report.failed_pages().iter().map(u32::to_string).collect();
        println!("Failed pages: {}", pages.join(", "));
    }
    Ok(())
}

async fn batch(config: &AppConfig, paths: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let files = inputs::expand_paths(&paths)?;
    let sources = inputs::load_sources(&files);
    if sources.is_empty() {
        return Err(LipikaError::UnsupportedSource("no image or PDF inputs".into()));
    }

    let mut orchestrator = orchestrator(config)?;
    orchestrator.enqueue_all(sources);

    let control = orchestrator.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current page");
            control.cancel();
        }
    });

    let report = orchestrator.run().await;
    println!("{}", orchestrator.summary());
    for item in orchestrator.items() {
        if let Some(message) = &item.error_message {
            println!("  {}: {}", item.source.name, message);
        }
    }

    if report.items_completed == 0 {
        return Err(LipikaError::Archive("no completed documents to bundle".into()));
    }
    let archive = orchestrator.export_archive(&DocumentExporter::new(config.export.clone()))?;
    let path = output.unwrap_or_else(|| PathBuf::from(default_archive_name()));
    std::fs::write(&path, &archive)?;
    println!(
        "{} document(s) written to {}",
        report.items_completed,
        path.display()
    );
    Ok(())
}
