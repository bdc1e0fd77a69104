use chrono::{DateTime, FixedOffset};

use crate::models::{HeadlineRecord, Region, RegionWeather};

pub const WEATHER_UNAVAILABLE: &str = "weather data unavailable";
pub const NO_NEWS: &str = "No relevant news today.";
pub const OTHER_BUCKET: &str = "Other";

/// How headlines are arranged in the digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// All weather lines, then every headline
    Flat,
    /// Each region's weather line with the headlines of feeds labelled for it, then one block per other feed
    ByFeed,
    /// Headlines assigned to regions by their titles
    ByRegion,
}

/// Where headlines that mention no known region end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmatched {
    /// A separate bucket rendered last under [`OTHER_BUCKET`]
    Other,
    /// Folded into the named region
    Region(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Weather {
        region: String,
        weather: Option<RegionWeather>,
    },
    Heading {
        label: String,
    },
    Headline {
        title: String,
        summary: String,
        link: String,
    },
}

impl Section {
    pub fn headline(record: &HeadlineRecord) -> Self {
        Section::Headline {
            title: record.title.clone(),
            summary: record
                .summary
                .clone()
                .unwrap_or_else(|| record.title.clone()),
            link: record.link.clone(),
        }
    }

    fn render(&self) -> String {
        match self {
            Section::Weather {
                region,
                weather: Some(w),
            } => format!(
                "{} weather: {}, {:.2}°C",
                region, w.description, w.temperature_celsius
            ),
            Section::Weather {
                region,
                weather: None,
            } => format!("{} weather: {}", region, WEATHER_UNAVAILABLE),
            Section::Heading { label } => format!("【{}】", label),
            Section::Headline {
                title,
                summary,
                link,
            } => format!("{}\n{}\n{}", title, summary, link),
        }
    }
}

/// The rendered report
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub header: String,
    pub body: String,
    pub headline_count: usize,
}

impl Digest {
    pub fn text(&self) -> String {
        format!("{}\n\n{}", self.header, self.body)
    }
}

/// Collects sections in order and renders them only in [`DigestBuilder::build`].
#[derive(Debug, Clone)]
pub struct DigestBuilder {
    title: String,
    generated_at: DateTime<FixedOffset>,
    sections: Vec<Section>,
}

impl DigestBuilder {
    pub fn new(title: impl Into<String>, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            title: title.into(),
            generated_at,
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: Section) -> &mut Self {
        self.sections.push(section);
        self
    }

    pub fn weather(&mut self, region: &Region, weather: Option<&RegionWeather>) -> &mut Self {
        self.push(Section::Weather {
            region: region.name.clone(),
            weather: weather.cloned(),
        })
    }

    pub fn heading(&mut self, label: impl Into<String>) -> &mut Self {
        self.push(Section::Heading {
            label: label.into(),
        })
    }

    pub fn headlines<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a HeadlineRecord>,
    ) -> &mut Self {
        for record in records {
            self.push(Section::headline(record));
        }
        self
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn headline_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| matches!(s, Section::Headline { .. }))
            .count()
    }

    pub fn build(&self) -> Digest {
        let header = format!(
            "{} {}",
            self.title,
            self.generated_at.format("%Y-%m-%d %H:%M")
        );

        let headline_count = self.headline_count();
        let body = if headline_count == 0 {
            NO_NEWS.to_string()
        } else {
            self.sections
                .iter()
                .map(Section::render)
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        Digest {
            header,
            body,
            headline_count,
        }
    }
}

/// Ordered `(region, predicate)` pairs; the first region whose predicate accepts a title wins.
pub struct RegionClassifier {
    rules: Vec<(String, Box<dyn Fn(&str) -> bool + Send + Sync>)>,
    unmatched: Unmatched,
}

impl RegionClassifier {
    /// One rule per region: case-insensitive substring match of the region name
    pub fn by_name(regions: &[Region], unmatched: Unmatched) -> Self {
        let mut classifier = Self {
            rules: Vec::new(),
            unmatched,
        };
        for region in regions {
            let needle = region.name.to_lowercase();
            classifier = classifier.rule(region.name.clone(), move |title: &str| {
                title.to_lowercase().contains(&needle)
            });
        }
        classifier
    }

    pub fn rule(
        mut self,
        region: impl Into<String>,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rules.push((region.into(), Box::new(predicate)));
        self
    }

    /// Region name for a title, or `None` when it falls into the "Other" bucket
    pub fn classify(&self, title: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|(_, predicate)| predicate(title))
            .map(|(region, _)| region.clone())
            .or_else(|| match &self.unmatched {
                Unmatched::Region(region) => Some(region.clone()),
                Unmatched::Other => None,
            })
    }
}

/// Heading for a feed block: its label, or its 1-based position for unlabelled feeds
fn feed_heading(feed: usize, label: Option<&str>) -> String {
    match label {
        Some(label) => label.to_string(),
        None => format!("Feed {}", feed + 1),
    }
}

/// Renders weather and already ranked/summarized headlines in the given layout.
///
/// `weather` is in region order. The by-feed layout groups headlines by
/// [`HeadlineRecord::feed`], so they should already be ranked per feed.
pub fn assemble(
    builder: &mut DigestBuilder,
    layout: Layout,
    weather: &[(Region, Option<RegionWeather>)],
    headlines: &[HeadlineRecord],
    classifier: &RegionClassifier,
) -> Digest {
    match layout {
        Layout::Flat => {
            for (region, w) in weather {
                builder.weather(region, w.as_ref());
            }
            builder.headlines(headlines);
        }
        Layout::ByFeed => {
            // Feeds in the order their first headline appears
            let mut feeds: Vec<(usize, Option<&str>)> = Vec::new();
            for record in headlines {
                if !feeds.iter().any(|(feed, _)| *feed == record.feed) {
                    feeds.push((record.feed, record.source.as_deref()));
                }
            }

            // Regions first, in configured order, with the headlines of feeds labelled for them
            for (region, w) in weather {
                builder.weather(region, w.as_ref());
                builder.headlines(
                    headlines
                        .iter()
                        .filter(|r| r.source.as_deref() == Some(region.name.as_str())),
                );
            }
            // Every other feed gets its own block
            for (feed, label) in feeds {
                if weather
                    .iter()
                    .any(|(region, _)| Some(region.name.as_str()) == label)
                {
                    continue;
                }
                builder.heading(feed_heading(feed, label));
                builder.headlines(headlines.iter().filter(|r| r.feed == feed));
            }
        }
        Layout::ByRegion => {
            let assigned: Vec<(Option<String>, &HeadlineRecord)> = headlines
                .iter()
                .map(|r| (classifier.classify(&r.title), r))
                .collect();

            for (region, w) in weather {
                builder.weather(region, w.as_ref());
                builder.headlines(
                    assigned
                        .iter()
                        .filter(|(name, _)| name.as_deref() == Some(region.name.as_str()))
                        .map(|(_, r)| *r),
                );
            }

            // Unmatched records, plus any assigned to a region we have no weather slot for
            let leftovers: Vec<&HeadlineRecord> = assigned
                .iter()
                .filter(|(name, _)| match name {
                    None => true,
                    Some(name) => !weather.iter().any(|(region, _)| &region.name == name),
                })
                .map(|(_, r)| *r)
                .collect();
            if !leftovers.is_empty() {
                builder.heading(OTHER_BUCKET);
                builder.headlines(leftovers);
            }
        }
    }

    builder.build()
}
