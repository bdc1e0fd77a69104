// Public modules
pub mod config;
pub mod digest;
pub mod feeds;
pub mod links;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod retry;
pub mod summarizer;
pub mod translate;
pub mod weather;
pub mod webhook;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{Config, Settings};
pub use digest::{Digest, DigestBuilder, Layout, RegionClassifier, Section, Unmatched};
pub use feeds::{FeedReader, HttpFeedReader};
pub use links::{LinkMode, LinkShortener, TinyUrlShortener};
pub use llm::{LanguageModel, OpenAiClient};
pub use models::{FeedLocation, HeadlineRecord, Region, RegionWeather};
pub use pipeline::{build_digest, build_summarizer, run, Collaborators, RunReport};
pub use ranking::{rank, KeywordSet};
pub use retry::RetryPolicy;
pub use summarizer::{Summarizer, SummaryMode};
pub use translate::{GoogleTranslator, Translator};
pub use weather::{OpenWeatherClient, WeatherSource};
pub use webhook::{FeishuWebhook, Notifier};
