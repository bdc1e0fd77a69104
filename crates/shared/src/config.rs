use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::time::Duration;

use crate::digest::{Layout, Unmatched};
use crate::links::LinkMode;
use crate::models::{FeedLocation, Region};
use crate::ranking::KeywordSet;
use crate::retry::RetryPolicy;
use crate::summarizer::SummaryMode;

pub const WEBHOOK_ENV: &str = "FEISHU_WEBHOOK";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENWEATHER_KEY_ENV: &str = "OPENWEATHER_API_KEY";

const SETUP_HINT: &str = "To fix this, create ~/.config/sea-digest/.env with:\n  \
    FEISHU_WEBHOOK=https://open.feishu.cn/open-apis/bot/v2/hook/...\n  \
    OPENAI_API_KEY=your_key_here\n  \
    OPENWEATHER_API_KEY=your_key_here";

/// Secrets required before a run may touch the network.
#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_url: String,
    pub openai_api_key: String,
    pub openweather_api_key: String,
}

impl Config {
    pub fn new(
        webhook_url: impl Into<String>,
        openai_api_key: impl Into<String>,
        openweather_api_key: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            webhook_url: webhook_url.into().trim().to_string(),
            openai_api_key: openai_api_key.into().trim().to_string(),
            openweather_api_key: openweather_api_key.into().trim().to_string(),
        };

        for (name, value) in [
            (WEBHOOK_ENV, &config.webhook_url),
            (OPENAI_KEY_ENV, &config.openai_api_key),
            (OPENWEATHER_KEY_ENV, &config.openweather_api_key),
        ] {
            if value.is_empty() {
                anyhow::bail!("{} is set but empty.\n\n{}", name, SETUP_HINT);
            }
        }

        url::Url::parse(&config.webhook_url)
            .with_context(|| format!("{} is not a valid URL", WEBHOOK_ENV))?;

        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let webhook_url = Self::required(WEBHOOK_ENV)?;
        let openai_api_key = Self::required(OPENAI_KEY_ENV)?;
        let openweather_api_key = Self::required(OPENWEATHER_KEY_ENV)?;

        Self::new(webhook_url, openai_api_key, openweather_api_key)
    }

    fn required(name: &str) -> Result<String> {
        env::var(name).with_context(|| format!("{} not found.\n\n{}", name, SETUP_HINT))
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/sea-digest/.env
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("sea-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

/// Pipeline switches. The defaults reproduce the daily cross-border e-commerce bulletin.
#[derive(Debug, Clone)]
pub struct Settings {
    pub title: String,
    pub feeds: Vec<FeedLocation>,
    pub regions: Vec<Region>,
    pub keywords: KeywordSet,
    /// Entries taken from the top of each feed
    pub per_feed_cap: usize,
    /// Headlines kept after ranking (per feed in the by-feed layout)
    pub keep: usize,
    pub layout: Layout,
    pub unmatched: Unmatched,
    pub summary_mode: SummaryMode,
    pub include_source_summary: bool,
    pub link_mode: LinkMode,
    pub model: String,
    pub source_language: String,
    pub target_language: String,
    pub retry: RetryPolicy,
    pub utc_offset: FixedOffset,
}

pub const DEFAULT_FEED: &str =
    "https://news.google.com/rss/search?q=Southeast+Asia+ecommerce&hl=en-US&gl=US&ceid=US:en";

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "🌏 Southeast Asia Cross-border E-commerce Daily".to_string(),
            feeds: vec![FeedLocation::new(DEFAULT_FEED)],
            regions: default_regions(),
            keywords: KeywordSet::new([
                "Shopee",
                "Lazada",
                "TikTok Shop",
                "Tokopedia",
                "e-commerce",
                "ecommerce",
            ]),
            per_feed_cap: 5,
            keep: 5,
            layout: Layout::Flat,
            unmatched: Unmatched::Other,
            summary_mode: SummaryMode::Model,
            include_source_summary: false,
            link_mode: LinkMode::Keep,
            model: "gpt-4o-mini".to_string(),
            source_language: "en".to_string(),
            target_language: "zh-CN".to_string(),
            retry: RetryPolicy::fixed(3, Duration::from_secs(2), Duration::from_secs(15)),
            utc_offset: FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

pub fn default_regions() -> Vec<Region> {
    vec![
        Region::new("Thailand", "Bangkok,TH"),
        Region::new("Malaysia", "Kuala Lumpur,MY"),
        Region::new("Vietnam", "Hanoi,VN"),
        Region::new("Philippines", "Manila,PH"),
        Region::new("Singapore", "Singapore,SG"),
    ]
}
