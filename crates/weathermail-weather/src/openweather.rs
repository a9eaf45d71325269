use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{error, info};
use weathermail_types::City;

use crate::WeatherSource;
use crate::error::FetchError;
use crate::model::{Observation, round_one_decimal};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenWeather "current weather" client.
#[derive(Clone)]
pub struct OpenWeatherClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherClient {
    /// A missing key is not an error here; every fetch reports
    /// [`FetchError::Config`] instead.
    pub fn new(api_key: Option<String>, base_url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(api_key, base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: Option<String>,
        base_url: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
    feels_like: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
}

impl From<OwCurrentResponse> for Observation {
    fn from(parsed: OwCurrentResponse) -> Self {
        let conditions = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .unwrap_or_else(|| "unknown".to_string());

        Observation {
            temperature: round_one_decimal(parsed.main.temp),
            humidity: parsed.main.humidity,
            conditions,
            feels_like: round_one_decimal(parsed.main.feels_like.unwrap_or(parsed.main.temp)),
        }
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self, city: &str) -> Result<Observation, FetchError> {
        let city = City::try_from(city).map_err(|e| FetchError::InvalidCity(e.0))?;
        let api_key = self.api_key.as_deref().ok_or(FetchError::Config)?;

        info!("Fetching weather data for {} from OpenWeather", city);

        let res = self
            .http
            .get(format!("{}/weather", self.base_url))
            .query(&[("q", city.as_str()), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(city.to_string()));
        }

        let body = res.text().await?;
        if !status.is_success() {
            error!(
                "OpenWeather request for {} failed with status {}: {}",
                city,
                status,
                truncate_body(&body)
            );
            return Err(FetchError::Upstream(status.as_u16()));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::Unexpected(format!("malformed weather payload: {e}")))?;

        Ok(parsed.into())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(Some("test-key".into()), &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn normalizes_current_weather() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "New York"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "New York",
                "main": {"temp": 18.34, "humidity": 70, "feels_like": 17.96},
                "weather": [{"description": "clear sky"}, {"description": "mist"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let obs = client(&server).fetch("New York").await.unwrap();
        assert_eq!(
            obs,
            Observation {
                temperature: 18.3,
                humidity: 70,
                conditions: "clear sky".into(),
                feels_like: 18.0,
            }
        );
    }

    #[tokio::test]
    async fn feels_like_defaults_to_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "main": {"temp": 4.26, "humidity": 91},
                "weather": [{"description": "light rain"}]
            })))
            .mount(&server)
            .await;

        let obs = client(&server).fetch("London").await.unwrap();
        assert_eq!(obs.temperature, 4.3);
        assert_eq!(obs.feels_like, 4.3);
    }

    #[tokio::test]
    async fn unknown_city_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).fetch("Atlantis").await.unwrap_err();
        assert_eq!(err, FetchError::InvalidCity("Atlantis".into()));
    }

    #[tokio::test]
    async fn missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let keyless = OpenWeatherClient::new(Some("   ".into()), &server.uri()).unwrap();
        assert!(!keyless.has_api_key());
        assert_eq!(keyless.fetch("Tokyo").await.unwrap_err(), FetchError::Config);
    }

    #[tokio::test]
    async fn maps_upstream_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Lahore"))
            .respond_with(ResponseTemplate::new(404).set_body_string("city not found"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Karachi"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Tokyo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let c = client(&server);
        assert_eq!(
            c.fetch("Lahore").await.unwrap_err(),
            FetchError::NotFound("Lahore".into())
        );
        assert_eq!(c.fetch("Karachi").await.unwrap_err(), FetchError::Upstream(503));
        assert!(matches!(
            c.fetch("Tokyo").await.unwrap_err(),
            FetchError::Unexpected(_)
        ));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({
                        "main": {"temp": 1.0, "humidity": 1},
                        "weather": []
                    })),
            )
            .mount(&server)
            .await;

        let c = OpenWeatherClient::with_timeout(
            Some("k".into()),
            &server.uri(),
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(c.fetch("London").await.unwrap_err(), FetchError::Timeout);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        // Nothing listens on the discard port.
        let c = OpenWeatherClient::new(Some("k".into()), "http://127.0.0.1:9").unwrap();
        assert_eq!(c.fetch("London").await.unwrap_err(), FetchError::Connection);
    }

    #[test]
    fn debug_output_hides_the_key() {
        let c = OpenWeatherClient::new(Some("super-secret".into()), DEFAULT_BASE_URL).unwrap();
        let printed = format!("{c:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }
}
