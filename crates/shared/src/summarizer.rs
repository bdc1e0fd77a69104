use tracing::{debug, warn};

use crate::llm::{ChatRequest, LanguageModel, Message};
use crate::models::{HeadlineRecord, UNTITLED};
use crate::retry::RetryPolicy;
use crate::translate::Translator;

/// Which stages of the fallback chain are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    /// Model, then translation, then title
    Model,
    /// Translation, then title
    Translate,
    /// Title only
    Title,
}

/// Which stage produced a synopsis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Model,
    Translation,
    Title,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synopsis {
    pub text: String,
    pub stage: Stage,
}

const SYSTEM_PROMPT: &str = "你是一名跨境电商新闻编辑，擅长用极简的中文概括英文新闻。";

/// Prompt options for the model stage
#[derive(Debug, Clone)]
pub struct PromptOptions {
    pub model: String,
    pub max_tokens: u32,
    /// Upper bound on synopsis length, in CJK characters
    pub max_chars: usize,
    pub include_source_summary: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 60,
            max_chars: 15,
            include_source_summary: false,
        }
    }
}

/// Produces a short synopsis per headline: remote model, then translation, then the title.
pub struct Summarizer {
    model: Option<Box<dyn LanguageModel>>,
    translator: Option<Box<dyn Translator>>,
    policy: RetryPolicy,
    prompt: PromptOptions,
    source_language: String,
    target_language: String,
}

impl Summarizer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            model: None,
            translator: None,
            policy,
            prompt: PromptOptions::default(),
            source_language: "en".to_string(),
            target_language: "zh-CN".to_string(),
        }
    }

    pub fn with_model(mut self, model: Box<dyn LanguageModel>, prompt: PromptOptions) -> Self {
        self.model = Some(model);
        self.prompt = prompt;
        self
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = source.into();
        self.target_language = target.into();
        self
    }

    pub fn request_for(&self, record: &HeadlineRecord) -> ChatRequest {
        let mut user = format!(
            "请用不超过{}个汉字概括下面这条新闻，只输出概括内容。\n标题：{}",
            self.prompt.max_chars, record.title
        );
        if self.prompt.include_source_summary {
            if let Some(summary) = record.source_summary.as_deref().filter(|s| !s.trim().is_empty()) {
                user.push_str(&format!("\n摘要：{}", summary));
            }
        }

        ChatRequest {
            model: self.prompt.model.clone(),
            max_tokens: self.prompt.max_tokens,
            temperature: 0.3,
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(user)],
        }
    }

    /// Never fails: the worst case is the original title.
    pub async fn summarize(&self, record: &HeadlineRecord) -> String {
        self.synopsis(record).await.text
    }

    pub async fn synopsis(&self, record: &HeadlineRecord) -> Synopsis {
        if let Some(model) = self.model.as_deref() {
            let request = self.request_for(record);
            let request = &request;
            let result = self
                .policy
                .run("summarize", |_| async move {
                    let text = model.complete(request).await?;
                    let cleaned = clean_model_output(&text);
                    if cleaned.is_empty() {
                        anyhow::bail!("model returned only whitespace or quotes");
                    }
                    Ok(cleaned)
                })
                .await;

            match result {
                Ok(text) => {
                    return Synopsis {
                        text,
                        stage: Stage::Model,
                    }
                }
                Err(e) => warn!(title = %record.title, error = %e, "Summarization failed; trying translation"),
            }
        }

        if let Some(translator) = self.translator.as_deref() {
            match translator
                .translate(&record.title, &self.source_language, &self.target_language)
                .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    return Synopsis {
                        text: text.trim().to_string(),
                        stage: Stage::Translation,
                    }
                }
                Ok(_) => warn!(title = %record.title, "Translation was empty; using title"),
                Err(e) => warn!(title = %record.title, error = %e, "Translation failed; using title"),
            }
        }

        Synopsis {
            text: fallback_title(record),
            stage: Stage::Title,
        }
    }

    /// Summarizes records one at a time, storing each synopsis on its record
    pub async fn summarize_all(&self, records: &mut [HeadlineRecord]) {
        for (index, record) in records.iter_mut().enumerate() {
            let synopsis = self.synopsis(record).await;
            debug!(index, stage = ?synopsis.stage, "Summarized headline");
            record.summary = Some(synopsis.text);
        }
    }
}

fn fallback_title(record: &HeadlineRecord) -> String {
    // Titles are defaulted during parsing, so this only guards hand-built records
    [record.title.trim(), record.link.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or(UNTITLED)
        .to_string()
}

/// Trims and drops one layer of wrapping quotes the model tends to add.
/// Single quotes are left alone; they usually quote a word inside the synopsis.
pub fn clean_model_output(text: &str) -> String {
    let trimmed = text.trim();
    let pairs = [('"', '"'), ('“', '”'), ('「', '」'), ('『', '』')];

    for (open, close) in pairs {
        if let Some(inner) = trimmed
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim().to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FakeModel {
        calls: Arc<AtomicU32>,
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, _request: &ChatRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(text) => Ok(text.to_string()),
                None => anyhow::bail!("service unavailable"),
            }
        }
    }

    struct FakeTranslator {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(&self, _text: &str, _source: &str, _target: &str) -> Result<String> {
            match self.reply {
                Some(text) => Ok(text.to_string()),
                None => anyhow::bail!("translation down"),
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::fixed(3, Duration::from_secs(2), Duration::from_secs(15))
    }

    fn model(reply: Option<&'static str>) -> (Box<dyn LanguageModel>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Box::new(FakeModel {
                calls: calls.clone(),
                reply,
            }),
            calls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_stage_wins() {
        let (m, calls) = model(Some("「虾皮加码越南」"));
        let summarizer = Summarizer::new(policy())
            .with_model(m, PromptOptions::default())
            .with_translator(Box::new(FakeTranslator { reply: Some("译文") }));

        let synopsis = summarizer
            .synopsis(&HeadlineRecord::new("Shopee expands in Vietnam", "https://a"))
            .await;

        assert_eq!(synopsis.stage, Stage::Model);
        assert_eq!(synopsis.text, "虾皮加码越南");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_translation_after_retries() {
        let (m, calls) = model(None);
        let summarizer = Summarizer::new(policy())
            .with_model(m, PromptOptions::default())
            .with_translator(Box::new(FakeTranslator { reply: Some("越南电商") }));

        let synopsis = summarizer
            .synopsis(&HeadlineRecord::new("Vietnam ecommerce", "https://a"))
            .await;

        assert_eq!(synopsis.stage, Stage::Translation);
        assert_eq!(synopsis.text, "越南电商");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_model_output_counts_as_failure() {
        let (m, calls) = model(Some("  \"\"  "));
        let summarizer = Summarizer::new(policy()).with_model(m, PromptOptions::default());

        let text = summarizer.summarize(&HeadlineRecord::new("X", "https://a")).await;

        assert_eq!(text, "X");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_everything_failing_returns_title() {
        let (m, _calls) = model(None);
        let summarizer = Summarizer::new(policy())
            .with_model(m, PromptOptions::default())
            .with_translator(Box::new(FakeTranslator { reply: None }));

        let text = summarizer.summarize(&HeadlineRecord::new("X", "https://a")).await;
        assert_eq!(text, "X");
    }

    #[tokio::test]
    async fn test_title_mode_without_services() {
        let summarizer = Summarizer::new(policy());
        let synopsis = summarizer
            .synopsis(&HeadlineRecord::new("Lazada cuts fees", "https://a"))
            .await;
        assert_eq!(synopsis.stage, Stage::Title);
        assert_eq!(synopsis.text, "Lazada cuts fees");
    }

    #[tokio::test]
    async fn test_blank_translation_falls_through() {
        let summarizer =
            Summarizer::new(policy()).with_translator(Box::new(FakeTranslator { reply: Some("  ") }));
        let text = summarizer.summarize(&HeadlineRecord::new("Y", "https://a")).await;
        assert_eq!(text, "Y");
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarize_all_sets_every_summary() {
        let summarizer =
            Summarizer::new(policy()).with_translator(Box::new(FakeTranslator { reply: None }));
        let mut records = vec![
            HeadlineRecord::new("one", "https://1"),
            HeadlineRecord::new("two", "https://2"),
        ];

        summarizer.summarize_all(&mut records).await;

        assert_eq!(records[0].summary.as_deref(), Some("one"));
        assert_eq!(records[1].summary.as_deref(), Some("two"));
    }

    #[test]
    fn test_request_includes_source_summary_when_enabled() {
        let (m, _) = model(Some("ok"));
        let prompt = PromptOptions {
            include_source_summary: true,
            ..PromptOptions::default()
        };
        let summarizer = Summarizer::new(policy()).with_model(m, prompt);
        let record = HeadlineRecord::new("Title", "https://a").with_source_summary("Body text");

        let request = summarizer.request_for(&record);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[1].content.contains("Title"));
        assert!(request.messages[1].content.contains("Body text"));
        assert!(request.messages[1].content.contains("15"));
    }

    #[test]
    fn test_clean_model_output() {
        assert_eq!(clean_model_output("  \"引号\" "), "引号");
        assert_eq!(clean_model_output("“弯引号”"), "弯引号");
        assert_eq!(clean_model_output("无引号"), "无引号");
    }

    #[test]
    fn test_clean_model_output_keeps_single_quotes() {
        assert_eq!(
            clean_model_output("'Shopee' beats 'Lazada'"),
            "'Shopee' beats 'Lazada'"
        );
    }

    #[tokio::test]
    async fn test_blank_record_still_gets_text() {
        let summarizer = Summarizer::new(policy());

        assert_eq!(summarizer.summarize(&HeadlineRecord::new("", "")).await, UNTITLED);
        assert_eq!(
            summarizer.summarize(&HeadlineRecord::new("  ", "https://a")).await,
            "https://a"
        );
    }
}
