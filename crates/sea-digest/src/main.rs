use anyhow::{Context, Result};
use chrono::{FixedOffset, Utc};
use clap::{Parser, ValueEnum};
use shared::{
    build_digest, build_summarizer, run, Collaborators, Config, FeedLocation, FeishuWebhook,
    GoogleTranslator, HttpFeedReader, KeywordSet, LanguageModel, Layout, LinkMode, LinkShortener,
    OpenAiClient, OpenWeatherClient, Region, Settings, SummaryMode, TinyUrlShortener, Translator,
    Unmatched,
};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    Flat,
    ByFeed,
    ByRegion,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Flat => Layout::Flat,
            LayoutArg::ByFeed => Layout::ByFeed,
            LayoutArg::ByRegion => Layout::ByRegion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SummaryArg {
    Model,
    Translate,
    Title,
}

impl From<SummaryArg> for SummaryMode {
    fn from(arg: SummaryArg) -> Self {
        match arg {
            SummaryArg::Model => SummaryMode::Model,
            SummaryArg::Translate => SummaryMode::Translate,
            SummaryArg::Title => SummaryMode::Title,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LinkArg {
    Keep,
    Strip,
    Shorten,
}

impl From<LinkArg> for LinkMode {
    fn from(arg: LinkArg) -> Self {
        match arg {
            LinkArg::Keep => LinkMode::Keep,
            LinkArg::Strip => LinkMode::Strip,
            LinkArg::Shorten => LinkMode::Shorten,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sea-digest")]
#[command(about = "Post a daily Southeast Asia e-commerce news and weather digest to a Feishu bot")]
struct Args {
    /// Print the digest instead of posting it
    #[arg(long)]
    dry_run: bool,

    /// Feed URL, optionally labelled: "Vietnam=https://..." (repeatable, ';' separated in the env var)
    #[arg(long = "feed", env = "DIGEST_FEEDS", value_delimiter = ';')]
    feeds: Vec<FeedLocation>,

    /// Relevance keyword (repeatable)
    #[arg(short, long = "keyword", env = "DIGEST_KEYWORDS", value_delimiter = ',')]
    keywords: Vec<String>,

    /// Region and weather query: "Thailand=Bangkok,TH" (repeatable, ';' separated in the env var)
    #[arg(short, long = "region", env = "DIGEST_REGIONS", value_delimiter = ';')]
    regions: Vec<Region>,

    /// Headlines kept after ranking
    #[arg(short = 'n', long, env = "DIGEST_KEEP")]
    keep: Option<usize>,

    /// Entries taken from the top of each feed
    #[arg(long, env = "DIGEST_PER_FEED")]
    per_feed: Option<usize>,

    #[arg(long, value_enum, env = "DIGEST_LAYOUT", default_value = "flat")]
    layout: LayoutArg,

    /// Region that receives headlines naming no region (default: a separate "Other" bucket)
    #[arg(long, env = "DIGEST_UNMATCHED_REGION")]
    unmatched_region: Option<String>,

    #[arg(long, value_enum, env = "DIGEST_SUMMARY", default_value = "model")]
    summary: SummaryArg,

    /// Send the feed's own summary to the model along with the title
    #[arg(long)]
    include_source_summary: bool,

    #[arg(long, value_enum, env = "DIGEST_LINKS", default_value = "keep")]
    links: LinkArg,

    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    #[arg(long, env = "DIGEST_TITLE")]
    title: Option<String>,

    /// Hours east of UTC used for the header timestamp
    #[arg(long, env = "DIGEST_UTC_OFFSET", default_value = "8", allow_hyphen_values = true)]
    utc_offset: i32,
}

impl Args {
    fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if !self.feeds.is_empty() {
            settings.feeds = self.feeds.clone();
        }
        if !self.keywords.is_empty() {
            settings.keywords = KeywordSet::new(self.keywords.iter());
        }
        if !self.regions.is_empty() {
            settings.regions = self.regions.clone();
        }
        if let Some(keep) = self.keep {
            settings.keep = keep;
        }
        if let Some(per_feed) = self.per_feed {
            settings.per_feed_cap = per_feed;
        }
        if let Some(region) = &self.unmatched_region {
            settings.unmatched = Unmatched::Region(region.clone());
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(title) = &self.title {
            settings.title = title.clone();
        }

        settings.layout = self.layout.into();
        settings.summary_mode = self.summary.into();
        settings.link_mode = self.links.into();
        settings.include_source_summary = self.include_source_summary;
        settings.utc_offset = self
            .utc_offset
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("UTC offset {} is out of range", self.utc_offset))?;

        Ok(settings)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    // Secrets are checked before anything touches the network
    let config = Config::from_env()?;
    let settings = args.settings()?;

    let model: Box<dyn LanguageModel> = Box::new(OpenAiClient::new(config.openai_api_key.clone())?);
    let translator: Box<dyn Translator> = Box::new(GoogleTranslator::new()?);
    let shortener: Option<Box<dyn LinkShortener>> = match settings.link_mode {
        LinkMode::Shorten => Some(Box::new(TinyUrlShortener::new()?) as Box<dyn LinkShortener>),
        LinkMode::Keep | LinkMode::Strip => None,
    };

    let collab = Collaborators {
        feeds: Box::new(HttpFeedReader::new()?),
        weather: Box::new(OpenWeatherClient::new(config.openweather_api_key.clone())?),
        summarizer: build_summarizer(&settings, Some(model), Some(translator)),
        shortener,
    };

    info!(
        feeds = settings.feeds.len(),
        regions = settings.regions.len(),
        layout = ?settings.layout,
        summary = ?settings.summary_mode,
        "Starting digest run"
    );

    if args.dry_run {
        let digest = build_digest(&settings, &collab, Utc::now()).await;
        println!("{}", digest.text());
        return Ok(());
    }

    let webhook = FeishuWebhook::new(config.webhook_url.clone())?;
    let report = run(&settings, &collab, &webhook, Utc::now()).await;

    if report.delivered {
        println!(
            "✓ Digest with {} headlines delivered",
            report.digest.headline_count
        );
    } else {
        // Delivery failure is not a failed run
        warn!("Digest was not delivered");
        println!("⚠ Digest was not delivered:\n\n{}", report.digest.text());
    }

    Ok(())
}
