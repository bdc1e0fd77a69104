use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::models::{FeedLocation, HeadlineRecord, UNTITLED};

/// An entry as it comes out of a feed, before it becomes a [`HeadlineRecord`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
}

/// Syndication feed source
#[async_trait]
pub trait FeedReader: Send + Sync {
    async fn read(&self, url: &str) -> Result<Vec<FeedEntry>>;
}

pub struct HttpFeedReader {
    client: Client,
}

impl HttpFeedReader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; SeaDigest/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedReader for HttpFeedReader {
    async fn read(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        parse_feed(&body)
    }
}

/// Parses an RSS or Atom document. Entries without a link are skipped.
pub fn parse_feed(content: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(content).context("Failed to parse feed")?;

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first()?.href.trim().to_string();
            if link.is_empty() {
                return None;
            }

            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string());

            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|html| html_to_text(&html))
                .filter(|s| !s.is_empty());

            Some(FeedEntry {
                title,
                link,
                summary,
            })
        })
        .collect();

    Ok(entries)
}

/// Feed summaries are usually HTML fragments; keep only their text
fn html_to_text(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), 10_000);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reads every feed in order, keeping at most `per_feed_cap` of each feed's
/// earliest entries. A failing feed is logged and skipped.
pub async fn fetch_headlines(
    reader: &dyn FeedReader,
    feeds: &[FeedLocation],
    per_feed_cap: usize,
) -> Vec<HeadlineRecord> {
    let mut records = Vec::new();

    for (index, feed) in feeds.iter().enumerate() {
        match reader.read(&feed.url).await {
            Ok(entries) => {
                let total = entries.len();
                let before = records.len();
                records.extend(entries.into_iter().take(per_feed_cap).map(|entry| {
                    HeadlineRecord {
                        title: entry.title,
                        link: entry.link,
                        source_summary: entry.summary,
                        score: 0,
                        summary: None,
                        source: feed.label.clone(),
                        feed: index,
                    }
                }));
                info!(
                    feed = %feed.url,
                    label = feed.label.as_deref().unwrap_or("-"),
                    kept = records.len() - before,
                    total,
                    "Fetched feed"
                );
            }
            Err(e) => {
                warn!(feed = %feed.url, error = %format!("{:#}", e), "Feed failed; skipping");
            }
        }
    }

    debug!(count = records.len(), "Collected headlines");
    records
}
