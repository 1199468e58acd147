//! Google News RSS search feed.
//!
//! Google News exposes topic searches as RSS 2.0 at
//! `https://news.google.com/rss/search?q=...&hl=en-US&gl=US&ceid=US:en`.
//! Item links point at `news.google.com` redirects, so the outlet is read from
//! the item's `<source url="...">` element instead, and the ` - Outlet`
//! suffix Google appends to every title is removed.

use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::{FeedQuery, FeedSource};
use crate::error::NewsError;
use crate::models::{Article, source_host};

/// Build the search URL for a topic, language and region.
///
/// The `ceid` parameter pairs the region with the bare language code
/// (`en-US` -> `US:en`).
pub fn build_feed_url(base_url: &str, topic: &str, language: &str, country: &str) -> String {
    let lang = language.split('-').next().unwrap_or(language);
    format!(
        "{}?q={}&hl={}&gl={}&ceid={}:{}",
        base_url.trim_end_matches('?'),
        urlencoding::encode(topic.trim()),
        urlencoding::encode(language),
        urlencoding::encode(country),
        urlencoding::encode(country),
        urlencoding::encode(lang),
    )
}

#[derive(Debug)]
pub struct GoogleNewsFeed {
    client: Client,
    base_url: String,
}

impl GoogleNewsFeed {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("news_coverage/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl FeedSource for GoogleNewsFeed {
    #[instrument(level = "info", skip_all, fields(topic = %query.topic, max = query.max_articles))]
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Article>, NewsError> {
        let url = build_feed_url(&self.base_url, &query.topic, &query.language, &query.country);
        let fetch_error = |reason: String| NewsError::Fetch {
            url: url.clone(),
            reason,
        };
        let t0 = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("feed returned status {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        debug!(bytes = body.len(), elapsed_ms = t0.elapsed().as_millis() as u64, "Downloaded feed");

        let articles = parse_feed(&body, query.max_articles).map_err(|e| fetch_error(e.to_string()))?;
        if articles.is_empty() {
            warn!(%url, "Feed contained no usable entries");
            return Err(NewsError::NoArticlesFound {
                topic: query.topic.clone(),
            });
        }

        info!(count = articles.len(), %url, "Fetched feed articles");
        Ok(articles)
    }
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    source: Option<RssSource>,
}

#[derive(Debug, Deserialize)]
struct RssSource {
    #[serde(rename = "@url", default)]
    url: Option<String>,
    #[serde(rename = "$text", default)]
    name: Option<String>,
}

/// Parse an RSS 2.0 document into at most `limit` articles, in document order.
///
/// Items without a title or link are skipped. Links repeated within the
/// document keep their first occurrence.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<Article>, quick_xml::DeError> {
    let document: RssDocument = quick_xml::de::from_str(xml)?;
    let mut articles: Vec<Article> = Vec::new();

    for item in document.channel.items {
        if articles.len() >= limit {
            break;
        }
        let link = item.link.unwrap_or_default();
        let source_name = item
            .source
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let source = item
            .source
            .as_ref()
            .and_then(|s| s.url.as_deref())
            .and_then(source_host)
            .or_else(|| source_host(&link))
            .unwrap_or_else(|| source_name.clone());
        let title = strip_source_suffix(item.title.as_deref().unwrap_or_default(), &source_name);
        let summary = item
            .description
            .as_deref()
            .map(html_to_text)
            .unwrap_or_default();
        let published_at = item.pub_date.as_deref().and_then(parse_pub_date);

        if articles.iter().any(|a| a.link() == link.trim()) {
            debug!(%link, "Skipping repeated feed link");
            continue;
        }
        match Article::new(title, link, summary, source, published_at) {
            Ok(article) => articles.push(article),
            Err(e) => warn!(error = %e, "Skipping unusable feed item"),
        }
    }

    Ok(articles)
}

fn strip_source_suffix(title: &str, source_name: &str) -> String {
    let title = title.trim();
    if source_name.is_empty() {
        return title.to_string();
    }
    title
        .strip_suffix(source_name)
        .and_then(|rest| rest.strip_suffix(" - "))
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(title)
        .to_string()
}

fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_pub_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <generator>NFE/5.0</generator>
    <title>"artificial intelligence" - Google News</title>
    <link>https://news.google.com/search?q=artificial+intelligence</link>
    <language>en-US</language>
    <item>
      <title>AI lab unveils new model - Reuters</title>
      <link>https://news.google.com/rss/articles/CBMiAAA?oc=5</link>
      <guid isPermaLink="false">CBMiAAA</guid>
      <pubDate>Tue, 06 May 2025 14:30:00 GMT</pubDate>
      <description>&lt;a href="https://news.google.com/rss/articles/CBMiAAA?oc=5"&gt;AI lab unveils new model&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font color="#6f6f6f"&gt;Reuters&lt;/font&gt;</description>
      <source url="https://www.reuters.com">Reuters</source>
    </item>
    <item>
      <title>Startups race to build agents - TechCrunch</title>
      <link>https://news.google.com/rss/articles/CBMiBBB?oc=5</link>
      <pubDate>not a date</pubDate>
      <description><![CDATA[<p>Funding keeps flowing.</p>]]></description>
      <source url="https://techcrunch.com">TechCrunch</source>
    </item>
    <item>
      <title>Untitled link</title>
      <link>https://www.example.org/post</link>
    </item>
    <item>
      <title></title>
      <link>https://news.google.com/rss/articles/CBMiCCC</link>
    </item>
  </channel>
</rss>"##;

    #[test]
    fn test_build_feed_url() {
        let url = build_feed_url(
            "https://news.google.com/rss/search",
            "Harry Styles",
            "en-US",
            "US",
        );
        assert_eq!(
            url,
            "https://news.google.com/rss/search?q=Harry%20Styles&hl=en-US&gl=US&ceid=US:en"
        );
    }

    #[test]
    fn test_build_feed_url_other_region() {
        let url = build_feed_url("https://news.google.com/rss/search", "COP28", "fr", "FR");
        assert!(url.ends_with("q=COP28&hl=fr&gl=FR&ceid=FR:fr"));
    }

    #[test]
    fn test_parse_feed_items() {
        let articles = parse_feed(SAMPLE_FEED, 10).unwrap();
        assert_eq!(articles.len(), 3);

        let first = &articles[0];
        assert_eq!(first.title(), "AI lab unveils new model");
        assert_eq!(first.link(), "https://news.google.com/rss/articles/CBMiAAA?oc=5");
        assert_eq!(first.source(), "reuters.com");
        assert_eq!(first.summary(), "AI lab unveils new model Reuters");
        assert_eq!(
            first.published_at().map(|d| d.to_rfc3339()),
            Some("2025-05-06T14:30:00+00:00".to_string())
        );

        let second = &articles[1];
        assert_eq!(second.title(), "Startups race to build agents");
        assert_eq!(second.source(), "techcrunch.com");
        assert_eq!(second.summary(), "Funding keeps flowing.");
        assert_eq!(second.published_at(), None);
    }

    #[test]
    fn test_parse_feed_falls_back_to_link_host() {
        let articles = parse_feed(SAMPLE_FEED, 10).unwrap();
        assert_eq!(articles[2].source(), "example.org");
        assert_eq!(articles[2].summary(), "");
    }

    #[test]
    fn test_parse_feed_respects_limit() {
        let articles = parse_feed(SAMPLE_FEED, 2).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].title(), "Startups race to build agents");
    }

    #[test]
    fn test_parse_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>Nothing</title></channel></rss>"#;
        assert!(parse_feed(xml, 20).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_document() {
        assert!(parse_feed("<html><body>Service unavailable</body></html>", 20).is_err());
    }

    #[test]
    fn test_strip_source_suffix() {
        assert_eq!(strip_source_suffix("Big news - BBC", "BBC"), "Big news");
        assert_eq!(strip_source_suffix("Big news - BBC", ""), "Big news - BBC");
        assert_eq!(strip_source_suffix("Big news", "BBC"), "Big news");
        assert_eq!(strip_source_suffix(" - BBC", "BBC"), "- BBC");
    }
}
