//! Data models for fetched articles and categorized reports.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: A normalized feed entry, immutable once fetched
//! - [`CategorizedItem`]: The AI-enriched view of an article
//! - [`Section`] and [`Report`]: The output taxonomy, serialized as JSON
//! - [`ReportRequest`]: The inbound request record
//!
//! The serialized field names of [`Report`] are the persisted wire shape:
//! `{"subject", "sections": [{"heading", "items": [{"title","link","source","tier","coverage_type"}]}]}`.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::NewsError;

/// A normalized news article as read from the feed.
///
/// The `link` is unique within one fetch and acts as the join key between
/// the feed, the model's answer and the merged report.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    title: String,
    link: String,
    summary: String,
    source: String,
    published_at: Option<DateTime<FixedOffset>>,
}

impl Article {
    /// Build an article, rejecting entries without a title or link.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        summary: impl Into<String>,
        source: impl Into<String>,
        published_at: Option<DateTime<FixedOffset>>,
    ) -> Result<Self, NewsError> {
        let title = title.into().trim().to_string();
        let link = link.into().trim().to_string();
        if title.is_empty() {
            return Err(NewsError::InvalidRequest(format!(
                "article {link:?} has no title"
            )));
        }
        if link.is_empty() {
            return Err(NewsError::InvalidRequest(format!(
                "article {title:?} has no link"
            )));
        }
        Ok(Self {
            title,
            link,
            summary: summary.into().trim().to_string(),
            source: source.into(),
            published_at,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        self.published_at
    }
}

/// Extract the outlet host from a URL, without a leading `www.`.
///
/// For example: `"https://www.reuters.com/world/x"` -> `"reuters.com"`.
pub fn source_host(link: &str) -> Option<String> {
    let parsed = url::Url::parse(link).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Editorial ranking of the outlet that published an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Top,
    #[default]
    Mid,
    Low,
}

impl Tier {
    /// Interpret a tier label produced by the model.
    ///
    /// Labels drift (`"Top Tier"`, `"top-tier"`, `"blog"`), so matching is
    /// lenient and anything unrecognized becomes [`Tier::Mid`].
    pub fn from_model(label: &str) -> Self {
        let normalized = normalize_label(label);
        match normalized.as_str() {
            "top" | "top tier" | "tier 1" | "tier1" | "high" => Tier::Top,
            "mid" | "mid tier" | "middle" | "medium" | "tier 2" | "tier2" => Tier::Mid,
            "low" | "low tier" | "tier 3" | "tier3" | "blog" | "blogs" => Tier::Low,
            _ => Tier::Mid,
        }
    }

    /// Label used in rendered documents.
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Top => "Top Tier",
            Tier::Mid => "Mid Tier",
            Tier::Low => "Low Tier",
        }
    }
}

/// Whether an article substantially covers the subject or only mentions it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageType {
    Headline,
    #[default]
    Mention,
}

impl CoverageType {
    /// Interpret a coverage label produced by the model; unknown labels become
    /// [`CoverageType::Mention`].
    pub fn from_model(label: &str) -> Self {
        let normalized = normalize_label(label);
        match normalized.as_str() {
            "headline" | "headlines" | "headline coverage" | "feature" | "primary" => {
                CoverageType::Headline
            }
            _ => CoverageType::Mention,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CoverageType::Headline => "Headline",
            CoverageType::Mention => "Mention",
        }
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// An article as placed in the report, enriched with tier and coverage type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedItem {
    pub title: String,
    pub link: String,
    pub source: String,
    pub tier: Tier,
    pub coverage_type: CoverageType,
}

impl CategorizedItem {
    pub fn from_article(article: &Article, tier: Tier, coverage_type: CoverageType) -> Self {
        Self {
            title: article.title().to_string(),
            link: article.link().to_string(),
            source: article.source().to_string(),
            tier,
            coverage_type,
        }
    }
}

/// A named grouping of items; the heading is the merge key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub items: Vec<CategorizedItem>,
}

impl Section {
    pub fn new(heading: impl Into<String>, items: Vec<CategorizedItem>) -> Self {
        Self {
            heading: heading.into(),
            items,
        }
    }
}

/// The root output record: a title plus ordered sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub subject: String,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn assemble(subject: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            subject: subject.into(),
            sections,
        }
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn default_max_articles() -> usize {
    20
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_country() -> String {
    "US".to_string()
}

/// Inbound request for one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// The topic to search for (e.g. "Harry Styles", "climate change").
    pub subject: String,
    /// Explicit report title; defaults to `"{subject} Coverage Report"`.
    #[serde(default)]
    pub subject_override: Option<String>,
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl ReportRequest {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            subject_override: None,
            max_articles: default_max_articles(),
            language: default_language(),
            country: default_country(),
            filename: None,
        }
    }

    /// The topic, trimmed; blank topics are rejected.
    pub fn topic(&self) -> Result<&str, NewsError> {
        let topic = self.subject.trim();
        if topic.is_empty() {
            return Err(NewsError::InvalidRequest("subject must not be empty".to_string()));
        }
        Ok(topic)
    }

    /// Title for the report: the override when given, else derived from the topic.
    pub fn report_subject(&self) -> Result<String, NewsError> {
        if let Some(title) = self
            .subject_override
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return Ok(title.to_string());
        }
        Ok(format!("{} Coverage Report", self.topic()?))
    }
}
