//! JSON persistence of reports.
//!
//! The file is the report itself, pretty-printed:
//!
//! ```text
//! {"subject": str, "sections": [{"heading": str, "items": [{"title","link","source","tier","coverage_type"}]}]}
//! ```
//!
//! Older files carried a flat `{"subject", "items": [...]}` list whose items
//! may lack `source`, `tier` and `coverage_type`. Those still load, as one
//! untitled section.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use super::DocumentRenderer;
use crate::error::NewsError;
use crate::models::{CategorizedItem, CoverageType, Report, Section, Tier, source_host};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    async fn render(&self, report: &Report) -> Result<Vec<u8>, NewsError> {
        Ok(serde_json::to_vec_pretty(report)?)
    }
}

/// Write `report` as pretty JSON to `{dir}/{filename}`.
pub async fn write_report(report: &Report, dir: &Path, filename: &str) -> Result<PathBuf, NewsError> {
    super::write_document(&JsonRenderer, report, dir, filename).await
}

#[derive(Debug, Deserialize)]
struct FlatReport {
    subject: String,
    items: Vec<FlatItem>,
}

#[derive(Debug, Deserialize)]
struct FlatItem {
    title: String,
    link: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    coverage_type: Option<String>,
}

impl From<FlatItem> for CategorizedItem {
    fn from(item: FlatItem) -> Self {
        let source = item
            .source
            .or_else(|| source_host(&item.link))
            .unwrap_or_default();
        Self {
            title: item.title,
            link: item.link,
            source,
            tier: item.tier.as_deref().map(Tier::from_model).unwrap_or_default(),
            coverage_type: item
                .coverage_type
                .as_deref()
                .map(CoverageType::from_model)
                .unwrap_or_default(),
        }
    }
}

/// Parse report JSON in either the sectioned or the flat `items` shape.
pub fn parse_report(json: &str) -> Result<Report, NewsError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.get("sections").is_some() {
        return Ok(serde_json::from_value(value)?);
    }
    if value.get("items").is_some() {
        let flat: FlatReport = serde_json::from_value(value)?;
        let items = flat.items.into_iter().map(CategorizedItem::from).collect();
        return Ok(Report::assemble(flat.subject, vec![Section::new("", items)]));
    }
    Err(NewsError::InvalidRequest(
        "report JSON must contain either `sections` or `items`".to_string(),
    ))
}

/// Load a previously written report.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_report(path: &Path) -> Result<Report, NewsError> {
    let json = fs::read_to_string(path).await?;
    let report = parse_report(&json)?;
    info!(sections = report.sections.len(), items = report.item_count(), "Loaded report");
    Ok(report)
}
