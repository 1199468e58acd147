//! Chunk categorization through the generative model.
//!
//! For each [`Chunk`] the model receives a fixed taxonomy instruction plus the
//! chunk's article metadata, and must answer with JSON of the shape
//!
//! ```text
//! {"sections":[{"heading":"...","items":[{"link":"...","tier":"top","coverage_type":"headline"}]}]}
//! ```
//!
//! Answers are validated against the chunk: items must reference the chunk's
//! articles by link. Title and source are always taken from the article
//! itself; only the heading, tier and coverage type come from the model.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::api::{AskAsync, ask_with_backoff};
use crate::batch::Chunk;
use crate::error::NewsError;
use crate::models::{Article, CategorizedItem, CoverageType, Section, Tier};
use crate::utils::{looks_truncated, truncate_chars, truncate_for_log};

/// Maximum summary length sent to the model per article, in characters.
const SUMMARY_CHARS: usize = 300;

/// Fixed system instruction describing the report taxonomy.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a media analyst preparing a PR coverage report. You receive a numbered list of news articles about one subject. Group the articles into report sections and classify each article.

Sections: use short, reusable headings such as "Headlines", "Business & Industry", "Products & Technology", "Opinion & Analysis" or "Other Mentions". Use exactly the same heading text for the same kind of coverage. Order sections by importance.

Tier describes the outlet:
- "top": major national or international outlets and wire services (for example Reuters, AP, BBC, The New York Times, Bloomberg, The Guardian, The Wall Street Journal)
- "mid": established regional, trade or specialist publications
- "low": blogs, aggregators, press-release sites and small independent sites

Coverage type describes the article:
- "headline": the article is substantially about the subject
- "mention": the subject appears only in passing

Rules:
- Place every article in exactly one section.
- Copy each article's link exactly as given. Never invent articles or links.

Respond with JSON only, in this shape:
{"sections":[{"heading":"...","items":[{"link":"...","title":"...","source":"...","tier":"top|mid|low","coverage_type":"headline|mention"}]}]}"#;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap());

/// Build the user message for one chunk.
pub fn build_prompt(topic: &str, chunk: &Chunk) -> String {
    let entries = chunk
        .articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            let mut entry = format!(
                "{}. Title: {}\n   Link: {}\n   Source: {}",
                i + 1,
                article.title(),
                article.link(),
                article.source()
            );
            if let Some(published) = article.published_at() {
                entry.push_str(&format!("\n   Published: {}", published.to_rfc3339()));
            }
            if !article.summary().is_empty() {
                entry.push_str(&format!(
                    "\n   Summary: {}",
                    truncate_chars(article.summary(), SUMMARY_CHARS)
                ));
            }
            entry
        })
        .join("\n\n");
    format!(
        "Subject: {}\n\nArticles ({}):\n\n{}",
        topic.trim(),
        chunk.len(),
        entries
    )
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    Wrapped { sections: Vec<RawSection> },
    Bare(Vec<RawSection>),
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    link: String,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    coverage_type: Option<String>,
}

/// A validated model answer for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCategorization {
    pub sections: Vec<Section>,
    /// Links of chunk articles the model did not place in any section.
    pub omitted: Vec<String>,
}

fn strip_code_fences(raw: &str) -> &str {
    match CODE_FENCE.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}

/// Parse and validate the model's answer for `chunk`.
///
/// Unknown links, blank headings and non-JSON output are
/// [`NewsError::MalformedResponse`]. Unrecognized tier or coverage labels
/// are coerced to `mid` / `mention`.
pub fn parse_categorization(raw: &str, chunk: &Chunk) -> Result<ChunkCategorization, NewsError> {
    let body = strip_code_fences(raw);
    let parsed: RawResponse = serde_json::from_str(body).map_err(|e| {
        if looks_truncated(&e) {
            warn!(chunk = chunk.index, error = %e, "EOF while parsing; response looks truncated");
        }
        NewsError::MalformedResponse(format!(
            "chunk {} answer is not the expected JSON ({e}): {}",
            chunk.index,
            truncate_for_log(body, 300)
        ))
    })?;
    let raw_sections = match parsed {
        RawResponse::Wrapped { sections } => sections,
        RawResponse::Bare(sections) => sections,
    };
    if raw_sections.is_empty() && !chunk.is_empty() {
        return Err(NewsError::MalformedResponse(format!(
            "chunk {} answer contains no sections",
            chunk.index
        )));
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut sections = Vec::with_capacity(raw_sections.len());
    for raw_section in raw_sections {
        let heading = raw_section.heading.trim();
        if heading.is_empty() {
            return Err(NewsError::MalformedResponse(format!(
                "chunk {} answer has a section without a heading",
                chunk.index
            )));
        }

        let mut items = Vec::with_capacity(raw_section.items.len());
        for raw_item in raw_section.items {
            let link = raw_item.link.trim();
            let article = chunk.article(link).ok_or_else(|| {
                NewsError::MalformedResponse(format!(
                    "chunk {} answer references unknown link {link:?}",
                    chunk.index
                ))
            })?;
            if !seen.insert(link.to_string()) {
                debug!(chunk = chunk.index, %link, "Model placed an article twice; keeping the first");
                continue;
            }
            let tier = raw_item.tier.as_deref().map(Tier::from_model).unwrap_or_default();
            let coverage_type = raw_item
                .coverage_type
                .as_deref()
                .map(CoverageType::from_model)
                .unwrap_or_default();
            items.push(CategorizedItem::from_article(article, tier, coverage_type));
        }
        sections.push(Section::new(heading, items));
    }

    let omitted: Vec<String> = chunk
        .articles
        .iter()
        .map(|a| a.link())
        .filter(|link| !seen.contains(*link))
        .map(str::to_string)
        .collect();
    if !omitted.is_empty() {
        warn!(chunk = chunk.index, omitted = omitted.len(), "Model left articles uncategorized");
    }

    Ok(ChunkCategorization { sections, omitted })
}

/// One attempt at categorizing a chunk: model call plus validation.
///
/// Validation failures are malformed responses, so the retry policy in
/// [`ask_with_backoff`] applies to them as well as to transport errors.
struct ChunkRequest<'a, M> {
    model: &'a M,
    chunk: &'a Chunk,
}

impl<M> fmt::Debug for ChunkRequest<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkRequest")
            .field("chunk", &self.chunk.index)
            .field("articles", &self.chunk.len())
            .finish()
    }
}

impl<M> AskAsync for ChunkRequest<'_, M>
where
    M: AskAsync<Response = String>,
{
    type Response = ChunkCategorization;

    async fn ask(&self, text: &str) -> Result<Self::Response, NewsError> {
        let raw = self.model.ask(text).await?;
        parse_categorization(&raw, self.chunk)
    }
}

/// Categorizes chunks with a model, retrying transient failures.
pub struct Categorizer<M> {
    model: M,
    max_attempts: usize,
    base_delay: Duration,
}

impl<M> Categorizer<M>
where
    M: AskAsync<Response = String>,
{
    pub fn new(model: M, max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            model,
            max_attempts,
            base_delay,
        }
    }

    /// Categorize one chunk; exhausting the retry policy yields
    /// [`NewsError::CategorizationFailed`].
    #[instrument(level = "info", skip_all, fields(chunk = chunk.index, articles = chunk.len()))]
    pub async fn categorize_chunk(
        &self,
        topic: &str,
        chunk: &Chunk,
    ) -> Result<ChunkCategorization, NewsError> {
        let prompt = build_prompt(topic, chunk);
        let request = ChunkRequest {
            model: &self.model,
            chunk,
        };
        let result = ask_with_backoff(request, &prompt, self.max_attempts, self.base_delay)
            .await
            .map_err(|e| NewsError::CategorizationFailed {
                chunk: chunk.index,
                reason: e.to_string(),
            })?;
        info!(sections = result.sections.len(), omitted = result.omitted.len(), "Categorized chunk");
        Ok(result)
    }
}

fn fallback_item(article: &Article) -> CategorizedItem {
    CategorizedItem::from_article(article, Tier::Mid, CoverageType::Mention)
}

/// Degraded placeholder for a chunk whose categorization failed: every
/// article under `heading`, tier `mid`, coverage `mention`.
pub fn fallback_section(chunk: &Chunk, heading: &str) -> Section {
    Section::new(heading, chunk.articles.iter().map(fallback_item).collect())
}

/// The chunk articles behind `omitted` links, placed like [`fallback_section`].
pub fn omitted_section(chunk: &Chunk, omitted: &[String], heading: &str) -> Section {
    let items = omitted
        .iter()
        .filter_map(|link| chunk.article(link))
        .map(fallback_item)
        .collect();
    Section::new(heading, items)
}
