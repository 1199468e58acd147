//! Markdown rendering of a report.
//!
//! Layout: the subject as `#` title, one `##` heading per section, and one
//! list entry per item with its source, tier and coverage type underneath.

use std::fmt::Write;

use super::DocumentRenderer;
use crate::error::NewsError;
use crate::models::{CategorizedItem, Report};

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl DocumentRenderer for MarkdownRenderer {
    fn extension(&self) -> &'static str {
        "md"
    }

    async fn render(&self, report: &Report) -> Result<Vec<u8>, NewsError> {
        Ok(report_to_markdown(report).into_bytes())
    }
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

fn metadata_line(item: &CategorizedItem) -> String {
    let mut parts = Vec::with_capacity(3);
    if !item.source.is_empty() {
        parts.push(format!("Source: {}", item.source));
    }
    parts.push(format!("Tier: {}", item.tier.display_name()));
    parts.push(format!("Coverage: {}", item.coverage_type.display_name()));
    format!("({})", parts.join(" | "))
}

/// Convert a [`Report`] to Markdown. An empty report is just its title, and
/// an untitled section gets no `##` line.
pub fn report_to_markdown(report: &Report) -> String {
    let mut md = String::new();
    writeln!(md, "# {}", report.subject).unwrap();

    for section in &report.sections {
        if section.heading.trim().is_empty() {
            md.push('\n');
        } else {
            writeln!(md, "\n## {}\n", section.heading).unwrap();
        }
        for item in &section.items {
            writeln!(md, "- [{}]({})  ", escape_link_text(&item.title), item.link).unwrap();
            writeln!(md, "  <small>{}</small>", metadata_line(item)).unwrap();
        }
    }

    md
}
