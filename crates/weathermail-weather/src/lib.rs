//! Current-conditions lookup for the weathermail cities.
//!
//! [`WeatherSource`] is the seam the report pipeline depends on;
//! [`OpenWeatherClient`] is the production implementation.

pub mod error;
pub mod model;
pub mod openweather;

pub use error::FetchError;
pub use model::{DataSource, Observation, WeatherResult, round_one_decimal};
pub use openweather::{DEFAULT_BASE_URL, OpenWeatherClient};

use async_trait::async_trait;
use std::fmt::Debug;

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Fetch current conditions for `city`. Implementations must reject
    /// cities outside the fixed list without touching the network.
    async fn fetch(&self, city: &str) -> Result<Observation, FetchError>;
}
