//! News feed sources.
//!
//! A feed source turns a topic query into a bounded list of normalized
//! [`Article`]s, in feed order.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Google News | [`google_news`] | RSS search | Topic, language and region as query parameters |
//!
//! # Contract
//!
//! - At most `max_articles` entries are returned
//! - An unreachable endpoint or unparseable document is [`NewsError::Fetch`]
//! - A document that parses but has no usable entries is [`NewsError::NoArticlesFound`]

use crate::error::NewsError;
use crate::models::{Article, ReportRequest};

pub mod google_news;

pub use google_news::GoogleNewsFeed;

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub topic: String,
    pub max_articles: usize,
    pub language: String,
    pub country: String,
}

impl FeedQuery {
    pub fn from_request(request: &ReportRequest) -> Result<Self, NewsError> {
        Ok(Self {
            topic: request.topic()?.to_string(),
            max_articles: request.max_articles,
            language: request.language.clone(),
            country: request.country.clone(),
        })
    }
}

/// A source of articles for a topic.
pub trait FeedSource {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Article>, NewsError>;
}
