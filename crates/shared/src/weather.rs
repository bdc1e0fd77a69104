use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::{Region, RegionWeather};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Condition descriptions come back in Simplified Chinese to match the synopses
const LANGUAGE: &str = "zh_cn";

/// Weather data source
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, region: &Region) -> Result<RegionWeather>;
}

#[derive(Deserialize)]
struct CurrentWeather {
    weather: Vec<Condition>,
    main: MainReadings,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: f64,
}

pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: OPENWEATHER_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current(&self, region: &Region) -> Result<RegionWeather> {
        let url = format!(
            "{}/data/2.5/weather?q={}&appid={}&units=metric&lang={}",
            self.base_url,
            urlencoding::encode(&region.weather_query),
            urlencoding::encode(&self.api_key),
            LANGUAGE
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send weather request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Weather API returned {}: {}", status, error_text);
        }

        let current = response
            .json::<CurrentWeather>()
            .await
            .context("Failed to parse weather response")?;

        let description = current
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .context("Weather response had no conditions")?;

        Ok(RegionWeather {
            region: region.name.clone(),
            description,
            temperature_celsius: current.main.temp,
        })
    }
}

/// Looks up every region in order. A failed lookup yields `None` for that region.
pub async fn fetch_weather(
    source: &dyn WeatherSource,
    regions: &[Region],
) -> Vec<(Region, Option<RegionWeather>)> {
    let mut out = Vec::with_capacity(regions.len());

    for region in regions {
        let weather = match source.current(region).await {
            Ok(weather) => {
                info!(region = %region.name, temp = weather.temperature_celsius, "Fetched weather");
                Some(weather)
            }
            Err(e) => {
                warn!(region = %region.name, query = %region.weather_query, error = %e, "Weather unavailable");
                None
            }
        };
        out.push((region.clone(), weather));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    #[tokio::test]
    async fn test_current_parses_openweather_payload() {
        let (base, captured) = serve_once(
            "200 OK",
            r#"{"weather":[{"id":802,"main":"Clouds","description":"多云"}],"main":{"temp":31.42,"humidity":70},"name":"Bangkok"}"#,
        )
        .await;
        let client = OpenWeatherClient::new("ow-key".to_string())
            .unwrap()
            .with_base_url(base);

        let weather = client
            .current(&Region::new("Thailand", "Bangkok,TH"))
            .await
            .unwrap();

        assert_eq!(weather.region, "Thailand");
        assert_eq!(weather.description, "多云");
        assert!((weather.temperature_celsius - 31.42).abs() < f64::EPSILON);

        let raw = captured.await.unwrap();
        assert!(raw.contains("q=Bangkok%2CTH"));
        assert!(raw.contains("units=metric"));
        assert!(raw.contains("appid=ow-key"));
        assert!(raw.contains("lang=zh_cn"));
    }

    #[tokio::test]
    async fn test_current_error_status() {
        let (base, _captured) =
            serve_once("401 Unauthorized", r#"{"cod":401,"message":"Invalid API key"}"#).await;
        let client = OpenWeatherClient::new("bad".to_string())
            .unwrap()
            .with_base_url(base);

        let err = client
            .current(&Region::new("Vietnam", "Hanoi,VN"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    struct FailingFor(&'static str);

    #[async_trait]
    impl WeatherSource for FailingFor {
        async fn current(&self, region: &Region) -> Result<RegionWeather> {
            if region.weather_query == self.0 {
                anyhow::bail!("city not found");
            }
            Ok(RegionWeather {
                region: region.name.clone(),
                description: "晴".to_string(),
                temperature_celsius: 30.0,
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_weather_isolates_failures() {
        let regions = vec![
            Region::new("Thailand", "Bangkok,TH"),
            Region::new("Vietnam", "Hanoi,VN"),
        ];

        let results = fetch_weather(&FailingFor("Bangkok,TH"), &regions).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_none());
        assert_eq!(results[1].1.as_ref().unwrap().description, "晴");
    }
}
