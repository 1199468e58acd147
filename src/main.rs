//! # News Coverage
//!
//! Builds PR-style coverage reports for a subject: recent articles are pulled
//! from the Google News RSS search feed, categorized by a Gemini model into
//! themed sections with a tier and coverage type per article, and written out
//! as JSON, Markdown or PDF.
//!
//! ## Usage
//!
//! ```sh
//! news_coverage generate --subject "Harry Styles" --format markdown
//! news_coverage render --input report.json --format pdf
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: Query the feed and normalize entries into articles
//! 2. **Chunking**: Split articles into model-sized chunks
//! 3. **Categorization**: Ask the model for sections per chunk, one chunk at a time
//! 4. **Merging**: Combine chunk sections by heading, dropping duplicate links
//! 5. **Output**: Persist the report JSON or render a document

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod batch;
mod categorize;
mod cli;
mod config;
mod error;
mod feeds;
mod merge;
mod models;
mod outputs;
mod pipeline;
#[cfg(test)]
mod test_support;
mod utils;

use api::GeminiClient;
use categorize::{Categorizer, SYSTEM_INSTRUCTION};
use cli::{Cli, Command, GenerateArgs, OutputFormat, RenderArgs};
use config::{AppConfig, load_config};
use error::NewsError;
use feeds::GoogleNewsFeed;
use models::Report;
use outputs::{CommandRenderer, MarkdownRenderer, json, write_document};
use pipeline::{Diagnostics, Pipeline};
use utils::{default_filename, ensure_writable_dir};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    let result = match args.command {
        Command::Generate(generate_args) => generate(generate_args).await,
        Command::Render(render_args) => render(render_args).await,
    };

    let elapsed = start_time.elapsed();
    match result {
        Ok(()) => {
            info!(?elapsed, secs = elapsed.as_secs(), millis = elapsed.subsec_millis(), "Execution complete");
            Ok(())
        }
        Err(e) => {
            error!(?elapsed, error = %e, "Execution failed");
            Err(e.into())
        }
    }
}

async fn generate(args: GenerateArgs) -> Result<(), NewsError> {
    let config = load_config(args.config.as_deref()).await?;
    let request = args.to_request();

    // Early check: output dir is writable and the format is available
    ensure_writable_dir(&args.output_dir).await?;
    if args.format == OutputFormat::Pdf && config.pdf_command.is_empty() {
        return Err(NewsError::Config(
            "PDF output needs `pdf_command` in the config file".to_string(),
        ));
    }

    let api_key = args.google_api_key.clone().unwrap_or_default();
    let model = GeminiClient::new(api_key, &config, SYSTEM_INSTRUCTION)?;
    let feed = GoogleNewsFeed::new(config.feed_base_url.clone(), config.feed_timeout())?;
    let pipeline = Pipeline::new(
        feed,
        Categorizer::new(model, config.max_attempts, config.backoff_base()),
        config.chunk_size,
        config.fallback_heading.clone(),
    );

    let run = pipeline.run(&request).await?;
    log_diagnostics(&run.diagnostics);
    if run.report.is_empty() {
        warn!(subject = %run.report.subject, "Report has no sections");
    }

    let filename = match &request.filename {
        Some(name) => name.clone(),
        None => default_filename(
            request.subject.trim(),
            extension_for(args.format),
            Local::now().naive_local(),
        ),
    };
    let path = write_output(&run.report, args.format, &config, &args.output_dir, &filename).await?;
    println!("{}", path.display());
    Ok(())
}

async fn render(args: RenderArgs) -> Result<(), NewsError> {
    let config = load_config(args.config.as_deref()).await?;
    let report = json::read_report(&args.input).await?;

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    ensure_writable_dir(&output_dir).await?;

    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let filename = format!("{}.{}", stem, extension_for(args.format));
    if output_dir.join(&filename) == args.input {
        return Err(NewsError::InvalidRequest(format!(
            "refusing to overwrite the input report {}",
            args.input.display()
        )));
    }

    let path = write_output(&report, args.format, &config, &output_dir, &filename).await?;
    println!("{}", path.display());
    Ok(())
}

fn extension_for(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Markdown => "md",
        OutputFormat::Pdf => "pdf",
    }
}

async fn write_output(
    report: &Report,
    format: OutputFormat,
    config: &AppConfig,
    output_dir: &Path,
    filename: &str,
) -> Result<PathBuf, NewsError> {
    match format {
        OutputFormat::Json => json::write_report(report, output_dir, filename).await,
        OutputFormat::Markdown => {
            write_document(&MarkdownRenderer, report, output_dir, filename).await
        }
        OutputFormat::Pdf => {
            let renderer = CommandRenderer::from_argv(&config.pdf_command, "pdf")?;
            write_document(&renderer, report, output_dir, filename).await
        }
    }
}

fn log_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.no_articles {
        warn!("Feed returned no articles for this subject");
        return;
    }
    for failure in &diagnostics.failures {
        warn!(chunk = failure.chunk, articles = failure.articles, reason = %failure.reason, "Chunk fell back");
    }
    info!(
        articles = diagnostics.articles_fetched,
        chunks = diagnostics.chunks,
        failed_chunks = diagnostics.failures.len(),
        omitted = diagnostics.omitted_links.len(),
        "Pipeline summary"
    );
}
