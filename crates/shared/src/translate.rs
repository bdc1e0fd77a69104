use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

pub const GOOGLE_TRANSLATE_BASE_URL: &str = "https://translate.googleapis.com";

/// Machine translation service
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

/// Client for the public `translate_a/single` endpoint used by browser extensions.
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("Mozilla/5.0 (compatible; SeaDigest/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: GOOGLE_TRANSLATE_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let url = format!(
            "{}/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.base_url,
            urlencoding::encode(source),
            urlencoding::encode(target),
            urlencoding::encode(text)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send translation request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Translation service returned {}", status);
        }

        let body = response
            .json::<Value>()
            .await
            .context("Failed to parse translation response")?;

        let translated = extract_translation(&body);
        if translated.trim().is_empty() {
            anyhow::bail!("Translation service returned no text");
        }

        Ok(translated)
    }
}

/// The endpoint answers with `[[["译文", "source", ...], ["更多", ...]], ...]`;
/// the translation is the concatenation of the first element of each segment.
fn extract_translation(body: &Value) -> String {
    body.get(0)
        .and_then(Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|segment| segment.get(0).and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use serde_json::json;

    #[test]
    fn test_extract_translation_joins_segments() {
        let body = json!([[["Shopee 扩张", "Shopee expands", null], ["至越南", " in Vietnam", null]], null, "en"]);
        assert_eq!(extract_translation(&body), "Shopee 扩张至越南");
    }

    #[test]
    fn test_extract_translation_unexpected_shape() {
        assert_eq!(extract_translation(&json!({"error": "x"})), "");
        assert_eq!(extract_translation(&json!([])), "");
    }

    #[tokio::test]
    async fn test_translate_encodes_query() {
        let (base, captured) = serve_once("200 OK", r#"[[["你好","Hello",null]],null,"en"]"#).await;
        let translator = GoogleTranslator::new().unwrap().with_base_url(base);

        let text = translator.translate("Hello & bye", "en", "zh-CN").await.unwrap();
        assert_eq!(text, "你好");

        let raw = captured.await.unwrap();
        assert!(raw.contains("sl=en&tl=zh-CN"));
        assert!(raw.contains("q=Hello%20%26%20bye"));
    }

    #[tokio::test]
    async fn test_translate_empty_result_is_error() {
        let (base, _captured) = serve_once("200 OK", "[[],null,\"en\"]").await;
        let translator = GoogleTranslator::new().unwrap().with_base_url(base);
        assert!(translator.translate("Hello", "en", "zh-CN").await.is_err());
    }
}
