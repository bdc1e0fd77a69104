use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stand-in title for items that arrive without one
pub const UNTITLED: &str = "Untitled";

/// One feed item carried through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineRecord {
    pub title: String,
    pub link: String,
    pub source_summary: Option<String>,
    pub score: u32,
    /// Synopsis produced by the summarizer (model output, translation or the title itself)
    pub summary: Option<String>,
    /// Label of the feed this record came from, if the feed was labelled
    pub source: Option<String>,
    /// Position of that feed in the configured feed list
    #[serde(default)]
    pub feed: usize,
}

impl HeadlineRecord {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            source_summary: None,
            score: 0,
            summary: None,
            source: None,
            feed: 0,
        }
    }

    pub fn with_source_summary(mut self, summary: impl Into<String>) -> Self {
        self.source_summary = Some(summary.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_feed(mut self, feed: usize) -> Self {
        self.feed = feed;
        self
    }
}

/// Current conditions for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionWeather {
    pub region: String,
    pub description: String,
    pub temperature_celsius: f64,
}

/// A named region and the query string the weather service understands for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub weather_query: String,
}

impl Region {
    pub fn new(name: impl Into<String>, weather_query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weather_query: weather_query.into(),
        }
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    /// Parses `"Thailand=Bangkok,TH"`. A bare name is used as its own query.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("Region must not be empty");
        }

        match s.split_once('=') {
            Some((name, query)) => {
                let (name, query) = (name.trim(), query.trim());
                if name.is_empty() || query.is_empty() {
                    anyhow::bail!("Invalid region '{}'. Use NAME=CITY,CC", s);
                }
                Ok(Region::new(name, query))
            }
            None => Ok(Region::new(s, s)),
        }
    }
}

/// Where to read a feed from, optionally labelled with the region it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLocation {
    pub label: Option<String>,
    pub url: String,
}

impl FeedLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            label: None,
            url: url.into(),
        }
    }

    pub fn labelled(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            url: url.into(),
        }
    }
}

impl FromStr for FeedLocation {
    type Err = anyhow::Error;

    /// Parses either a bare URL or `"Vietnam=https://..."`.
    ///
    /// Feed URLs routinely carry `=` in their query string, so the prefix only
    /// counts as a label when it does not itself look like a URL.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        let (label, url) = match s.split_once('=') {
            Some((label, rest)) if !label.contains("://") => (Some(label.trim()), rest.trim()),
            _ => (None, s),
        };

        url::Url::parse(url).with_context(|| format!("Invalid feed URL: {}", url))?;

        Ok(Self {
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_pair() {
        let region: Region = "Malaysia=Kuala Lumpur,MY".parse().unwrap();
        assert_eq!(region, Region::new("Malaysia", "Kuala Lumpur,MY"));
    }

    #[test]
    fn test_region_bare_name() {
        let region: Region = "Singapore".parse().unwrap();
        assert_eq!(region.weather_query, "Singapore");
    }

    #[test]
    fn test_region_rejects_empty_query() {
        assert!("Thailand=".parse::<Region>().is_err());
    }

    #[test]
    fn test_feed_location_bare_url_with_query() {
        let feed: FeedLocation = "https://news.google.com/rss/search?q=Shopee&hl=en-US"
            .parse()
            .unwrap();
        assert_eq!(feed.label, None);
        assert_eq!(feed.url, "https://news.google.com/rss/search?q=Shopee&hl=en-US");
    }

    #[test]
    fn test_feed_location_labelled() {
        let feed: FeedLocation = "Vietnam=https://example.com/rss?q=vn".parse().unwrap();
        assert_eq!(feed.label.as_deref(), Some("Vietnam"));
        assert_eq!(feed.url, "https://example.com/rss?q=vn");
    }

    #[test]
    fn test_feed_location_rejects_garbage() {
        assert!("not a url".parse::<FeedLocation>().is_err());
    }
}
