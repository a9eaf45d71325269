use thiserror::Error;

/// Why a single city lookup failed. Each variant is terminal for that city
/// within a run; nothing retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("City \"{0}\" is not in the allowed list")]
    InvalidCity(String),

    #[error("City \"{0}\" not found in weather service")]
    NotFound(String),

    #[error("Weather API key not configured")]
    Config,

    #[error("Request timeout while fetching weather data")]
    Timeout,

    #[error("Connection error while fetching weather data")]
    Connection,

    #[error("Weather API returned status {0}")]
    Upstream(u16),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connection
        } else {
            FetchError::Unexpected(e.to_string())
        }
    }
}
