//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::api::AskAsync;
use crate::error::NewsError;
use crate::feeds::{FeedQuery, FeedSource};
use crate::models::Article;

/// Replays a fixed list of model outcomes, one per call, and records prompts.
pub struct ScriptedModel {
    outcomes: Mutex<VecDeque<Result<String, NewsError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(outcomes: Vec<Result<String, NewsError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AskAsync for ScriptedModel {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<String, NewsError> {
        self.prompts.lock().unwrap().push(text.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NewsError::MalformedResponse("script exhausted".into())))
    }
}

/// Serves a fixed article list, truncated to the requested count.
pub struct StaticFeed {
    pub articles: Vec<Article>,
}

impl FeedSource for StaticFeed {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Article>, NewsError> {
        if self.articles.is_empty() {
            return Err(NewsError::NoArticlesFound {
                topic: query.topic.clone(),
            });
        }
        Ok(self
            .articles
            .iter()
            .take(query.max_articles)
            .cloned()
            .collect())
    }
}

/// A feed whose endpoint is down.
pub struct UnreachableFeed;

impl FeedSource for UnreachableFeed {
    async fn fetch(&self, _query: &FeedQuery) -> Result<Vec<Article>, NewsError> {
        Err(NewsError::Fetch {
            url: "https://news.google.com/rss/search".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

pub fn article(i: usize) -> Article {
    Article::new(
        format!("Story {i}"),
        format!("https://example.com/{i}"),
        format!("Summary of story {i}"),
        "example.com",
        None,
    )
    .unwrap()
}

pub fn articles(range: std::ops::Range<usize>) -> Vec<Article> {
    range.map(article).collect()
}

/// A model answer placing every given article index under one heading.
pub fn answer(heading: &str, indexes: &[usize]) -> String {
    let items: Vec<serde_json::Value> = indexes
        .iter()
        .map(|i| {
            serde_json::json!({
                "link": format!("https://example.com/{i}"),
                "title": format!("Story {i}"),
                "tier": "top",
                "coverage_type": "headline",
            })
        })
        .collect();
    serde_json::json!({ "sections": [{ "heading": heading, "items": items }] }).to_string()
}
