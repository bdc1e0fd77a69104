use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::digest::{assemble, Digest, DigestBuilder, Layout, RegionClassifier};
use crate::feeds::{fetch_headlines, FeedReader};
use crate::links::{apply_link_mode, LinkShortener};
use crate::llm::LanguageModel;
use crate::models::HeadlineRecord;
use crate::ranking::{rank, KeywordSet};
use crate::summarizer::{PromptOptions, Summarizer, SummaryMode};
use crate::translate::Translator;
use crate::weather::{fetch_weather, WeatherSource};
use crate::webhook::Notifier;

/// Everything a run talks to besides the webhook
pub struct Collaborators {
    pub feeds: Box<dyn FeedReader>,
    pub weather: Box<dyn WeatherSource>,
    pub summarizer: Summarizer,
    pub shortener: Option<Box<dyn LinkShortener>>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub digest: Digest,
    pub delivered: bool,
}

/// Wires the summary stages selected by `settings.summary_mode`; unused services are dropped.
pub fn build_summarizer(
    settings: &Settings,
    model: Option<Box<dyn LanguageModel>>,
    translator: Option<Box<dyn Translator>>,
) -> Summarizer {
    let mut summarizer = Summarizer::new(settings.retry.clone())
        .with_languages(&settings.source_language, &settings.target_language);

    if settings.summary_mode == SummaryMode::Model {
        if let Some(model) = model {
            let prompt = PromptOptions {
                model: settings.model.clone(),
                include_source_summary: settings.include_source_summary,
                ..PromptOptions::default()
            };
            summarizer = summarizer.with_model(model, prompt);
        }
    }

    if settings.summary_mode != SummaryMode::Title {
        if let Some(translator) = translator {
            summarizer = summarizer.with_translator(translator);
        }
    }

    summarizer
}

/// Fetch, rank, summarize and assemble. Never fails; missing data degrades to placeholders.
pub async fn build_digest(
    settings: &Settings,
    collab: &Collaborators,
    now: DateTime<Utc>,
) -> Digest {
    let weather = fetch_weather(collab.weather.as_ref(), &settings.regions).await;

    let fetched = fetch_headlines(
        collab.feeds.as_ref(),
        &settings.feeds,
        settings.per_feed_cap,
    )
    .await;
    let fetched_count = fetched.len();

    if settings.keywords.is_empty() {
        warn!("No keywords configured; headlines keep fetch order");
    }

    let mut headlines = match settings.layout {
        Layout::ByFeed => rank_per_feed(fetched, &settings.keywords, settings.keep),
        Layout::Flat | Layout::ByRegion => rank(fetched, &settings.keywords, settings.keep),
    };
    info!(fetched = fetched_count, kept = headlines.len(), "Ranked headlines");

    collab.summarizer.summarize_all(&mut headlines).await;
    apply_link_mode(&mut headlines, settings.link_mode, collab.shortener.as_deref()).await;

    let classifier = RegionClassifier::by_name(&settings.regions, settings.unmatched.clone());
    let mut builder = DigestBuilder::new(&settings.title, now.with_timezone(&settings.utc_offset));

    assemble(
        &mut builder,
        settings.layout,
        &weather,
        &headlines,
        &classifier,
    )
}

/// Ranks each feed's records separately, keeping `keep` per feed.
/// Feeds come out in the order their first record was seen.
fn rank_per_feed(
    records: Vec<HeadlineRecord>,
    keywords: &KeywordSet,
    keep: usize,
) -> Vec<HeadlineRecord> {
    let mut groups: Vec<(usize, Vec<HeadlineRecord>)> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|(feed, _)| *feed == record.feed) {
            Some((_, group)) => group.push(record),
            None => groups.push((record.feed, vec![record])),
        }
    }

    groups
        .into_iter()
        .flat_map(|(_, group)| rank(group, keywords, keep))
        .collect()
}

/// One full run. A delivery failure is logged and reported, not returned.
pub async fn run(
    settings: &Settings,
    collab: &Collaborators,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> RunReport {
    let digest = build_digest(settings, collab, now).await;

    let delivered = match notifier.send(&digest.text()).await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Delivery failed");
            false
        }
    };

    RunReport { digest, delivered }
}
