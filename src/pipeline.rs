//! The categorization pipeline: fetch, split, categorize, merge, assemble.
//!
//! Chunks are categorized one at a time, in index order. A chunk that fails
//! does not abort the run: its articles are placed under the fallback heading
//! (when one is configured) and the failure is recorded in [`Diagnostics`].
//! Articles the model leaves out of an otherwise valid answer go under the
//! same heading.
//! Only when every chunk fails does the run fail.

use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::api::AskAsync;
use crate::batch::{Chunk, split_into_chunks};
use crate::categorize::{Categorizer, ChunkCategorization, fallback_section, omitted_section};
use crate::error::NewsError;
use crate::feeds::{FeedQuery, FeedSource};
use crate::merge::merge_sections;
use crate::models::{Report, ReportRequest, Section};

/// A chunk whose categorization failed, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFailure {
    pub chunk: usize,
    pub articles: usize,
    pub reason: String,
}

/// What happened during a run, alongside the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub articles_fetched: usize,
    pub chunks: usize,
    pub failures: Vec<ChunkFailure>,
    /// Links the model left out of its answer; they are in the report only
    /// under the fallback heading.
    pub omitted_links: Vec<String>,
    /// The feed had no entries; the report is intentionally empty.
    pub no_articles: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub report: Report,
    pub diagnostics: Diagnostics,
}

pub struct Pipeline<F, M> {
    feed: F,
    categorizer: Categorizer<M>,
    chunk_size: usize,
    fallback_heading: Option<String>,
}

impl<F, M> Pipeline<F, M>
where
    F: FeedSource,
    M: AskAsync<Response = String>,
{
    pub fn new(
        feed: F,
        categorizer: Categorizer<M>,
        chunk_size: usize,
        fallback_heading: Option<String>,
    ) -> Self {
        Self {
            feed,
            categorizer,
            chunk_size,
            fallback_heading,
        }
    }

    /// Produce a report for `request`.
    #[instrument(level = "info", skip_all, fields(topic = %request.subject, max_articles = request.max_articles))]
    pub async fn run(&self, request: &ReportRequest) -> Result<PipelineRun, NewsError> {
        let t0 = Instant::now();
        let subject = request.report_subject()?;
        let query = FeedQuery::from_request(request)?;
        if query.max_articles == 0 {
            return Err(NewsError::InvalidRequest(
                "max_articles must be at least 1".to_string(),
            ));
        }

        let articles = match self.feed.fetch(&query).await {
            Ok(articles) => articles,
            Err(NewsError::NoArticlesFound { topic }) => {
                warn!(%topic, "No articles found; producing an empty report");
                return Ok(PipelineRun {
                    report: Report::assemble(subject, Vec::new()),
                    diagnostics: Diagnostics {
                        no_articles: true,
                        ..Diagnostics::default()
                    },
                });
            }
            Err(e) => return Err(e),
        };

        let chunks = split_into_chunks(&articles, self.chunk_size);
        info!(articles = articles.len(), chunks = chunks.len(), chunk_size = self.chunk_size, "Split articles into chunks");

        let topic = query.topic.as_str();
        let outcomes: Vec<(Chunk, Result<ChunkCategorization, NewsError>)> = stream::iter(chunks)
            .then(|chunk| async move {
                let result = self.categorizer.categorize_chunk(topic, &chunk).await;
                (chunk, result)
            })
            .collect()
            .await;

        let mut diagnostics = Diagnostics {
            articles_fetched: articles.len(),
            chunks: outcomes.len(),
            ..Diagnostics::default()
        };
        let per_chunk = self.resolve(outcomes, &mut diagnostics)?;
        let sections = merge_sections(per_chunk);
        let report = Report::assemble(subject, sections);

        info!(
            sections = report.sections.len(),
            items = report.item_count(),
            failed_chunks = diagnostics.failures.len(),
            omitted = diagnostics.omitted_links.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Report assembled"
        );
        Ok(PipelineRun {
            report,
            diagnostics,
        })
    }

    /// Turn per-chunk results into section lists in chunk order, substituting
    /// the fallback section for failures.
    fn resolve(
        &self,
        outcomes: Vec<(Chunk, Result<ChunkCategorization, NewsError>)>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Vec<Section>>, NewsError> {
        let total = outcomes.len();
        let mut per_chunk = Vec::with_capacity(total);
        let mut last_error = None;

        for (chunk, result) in outcomes {
            match result {
                Ok(categorization) => {
                    let mut sections = categorization.sections;
                    if let Some(heading) = &self.fallback_heading {
                        if !categorization.omitted.is_empty() {
                            sections.push(omitted_section(&chunk, &categorization.omitted, heading));
                        }
                    }
                    diagnostics.omitted_links.extend(categorization.omitted);
                    per_chunk.push(sections);
                }
                Err(e) => {
                    warn!(chunk = chunk.index, error = %e, "Chunk categorization failed");
                    diagnostics.failures.push(ChunkFailure {
                        chunk: chunk.index,
                        articles: chunk.len(),
                        reason: e.to_string(),
                    });
                    if let Some(heading) = &self.fallback_heading {
                        per_chunk.push(vec![fallback_section(&chunk, heading)]);
                    }
                    last_error = Some(e);
                }
            }
        }

        if total > 0 && diagnostics.failures.len() == total {
            return Err(NewsError::AllChunksFailed {
                chunks: total,
                last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
            });
        }
        Ok(per_chunk)
    }
}
