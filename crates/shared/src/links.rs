use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;
use url::Url;

use crate::models::HeadlineRecord;

pub const TINYURL_BASE_URL: &str = "https://tinyurl.com";

/// What to do with headline links before they go into the digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Keep,
    /// Host and path only, query and fragment dropped
    Strip,
    /// Remote shortening service, original link on failure
    Shorten,
}

/// Link-shortening service
#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, link: &str) -> Result<String>;
}

pub struct TinyUrlShortener {
    client: Client,
    base_url: String,
}

impl TinyUrlShortener {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: TINYURL_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LinkShortener for TinyUrlShortener {
    async fn shorten(&self, link: &str) -> Result<String> {
        let url = format!(
            "{}/api-create.php?url={}",
            self.base_url,
            urlencoding::encode(link)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send shortening request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Shortening service returned {}", status);
        }

        let short = response
            .text()
            .await
            .context("Failed to read shortening response")?
            .trim()
            .to_string();

        if !short.starts_with("http") {
            anyhow::bail!("Shortening service returned '{}'", short);
        }

        Ok(short)
    }
}

/// Reduces a link to scheme, host and path. Unparseable links come back unchanged.
pub fn strip_query(link: &str) -> String {
    match Url::parse(link) {
        Ok(mut url) if url.host_str().is_some() => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        _ => link.to_string(),
    }
}

/// Rewrites every record's link according to `mode`
pub async fn apply_link_mode(
    records: &mut [HeadlineRecord],
    mode: LinkMode,
    shortener: Option<&dyn LinkShortener>,
) {
    match mode {
        LinkMode::Keep => {}
        LinkMode::Strip => {
            for record in records.iter_mut() {
                record.link = strip_query(&record.link);
            }
        }
        LinkMode::Shorten => {
            let Some(shortener) = shortener else {
                warn!("Link shortening requested but no shortener configured");
                return;
            };
            for record in records.iter_mut() {
                match shortener.shorten(&record.link).await {
                    Ok(short) => record.link = short,
                    Err(e) => warn!(link = %record.link, error = %e, "Shortening failed; keeping original link"),
                }
            }
        }
    }
}
