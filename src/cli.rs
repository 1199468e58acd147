//! Command-line interface definitions.
//!
//! Two subcommands: `generate` runs the whole pipeline for a topic, and
//! `render` turns a previously written report JSON into another format.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::ReportRequest;

/// Builds categorized news coverage reports from Google News.
///
/// # Examples
///
/// ```sh
/// # JSON report for a topic
/// news_coverage generate --subject "Harry Styles"
///
/// # Markdown, custom title, smaller pull
/// news_coverage generate -s "OpenAI" --subject-override "OpenAI Weekly" -n 10 -f markdown
///
/// # Re-render a saved report as PDF
/// news_coverage render -i ./OpenAI-coverage-20250506-143000.json -f pdf
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, categorize and write a coverage report
    Generate(GenerateArgs),
    /// Render an existing report JSON
    Render(RenderArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Pdf,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Topic to search news for
    #[arg(short, long)]
    pub subject: String,

    /// Report title; defaults to "{subject} Coverage Report"
    #[arg(long)]
    pub subject_override: Option<String>,

    /// Maximum number of articles to collect
    #[arg(short = 'n', long, default_value_t = 20)]
    pub max_articles: usize,

    /// Feed language (hl)
    #[arg(long, default_value = "en-US")]
    pub language: String,

    /// Feed country (gl)
    #[arg(long, default_value = "US")]
    pub country: String,

    /// Output filename; defaults to a timestamped name
    #[arg(long)]
    pub filename: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Google Generative Language API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,
}

impl GenerateArgs {
    pub fn to_request(&self) -> ReportRequest {
        ReportRequest {
            subject_override: self.subject_override.clone(),
            max_articles: self.max_articles,
            language: self.language.clone(),
            country: self.country.clone(),
            filename: self.filename.clone(),
            ..ReportRequest::new(self.subject.clone())
        }
    }
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Report JSON written by `generate`
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Defaults to the input file's directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
