use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use weathermail_db::{Database, format_timestamp};
use weathermail_types::City;
use weathermail_weather::{DataSource, Observation, WeatherResult, WeatherSource};

use crate::with_db;

/// Snapshots younger than this are served from the cache.
pub const DEFAULT_CACHE_WINDOW_MINUTES: i64 = 180;

/// Resolves current weather for every actively subscribed city, reading the
/// snapshot cache before calling the provider.
pub struct WeatherResolver {
    db: Arc<Database>,
    source: Arc<dyn WeatherSource>,
    cache_window: Duration,
}

impl WeatherResolver {
    pub fn new(db: Arc<Database>, source: Arc<dyn WeatherSource>, cache_window: Duration) -> Self {
        Self {
            db,
            source,
            cache_window,
        }
    }

    pub async fn resolve_weather_for_active_subscriptions(&self) -> BTreeMap<City, WeatherResult> {
        self.resolve_at(Utc::now(), None).await
    }

    /// Resolve as of `now`, optionally narrowed to a single city. Cities are
    /// independent: a failure for one is recorded in its entry and the loop
    /// moves on.
    pub async fn resolve_at(
        &self,
        now: DateTime<Utc>,
        only: Option<City>,
    ) -> BTreeMap<City, WeatherResult> {
        let cities = self.active_cities(only).await;
        let mut results = BTreeMap::new();

        if cities.is_empty() {
            info!("No cities with active subscriptions found");
            return results;
        }

        info!("Fetching weather data for {} cities", cities.len());
        for city in cities {
            let result = self.resolve_city(city, now).await;
            results.insert(city, result);
        }

        let successful = results.values().filter(|r| r.is_success()).count();
        info!(
            "Weather fetch complete: {} successful, {} failed",
            successful,
            results.len() - successful
        );

        results
    }

    pub async fn resolve_city(&self, city: City, now: DateTime<Utc>) -> WeatherResult {
        if let Some(observation) = self.cached(city, now).await {
            return WeatherResult::Success {
                city,
                observation,
                source: DataSource::Cache,
            };
        }

        info!("No recent data found for {}, fetching from provider", city);
        match self.source.fetch(city.as_str()).await {
            Ok(observation) => {
                // The live result is returned even if it cannot be cached.
                let snapshot = observation.clone();
                let saved = with_db(&self.db, move |db| {
                    db.insert_snapshot(
                        city.as_str(),
                        snapshot.temperature,
                        snapshot.humidity,
                        &snapshot.conditions,
                        &format_timestamp(now),
                    )
                })
                .await;
                match saved {
                    Ok(_) => info!("Saved fresh weather data for {}", city),
                    Err(e) => warn!("Failed to save weather data for {}: {}", city, e),
                }

                info!(
                    "Fetched weather for {}: {}°C, {}",
                    city, observation.temperature, observation.conditions
                );
                WeatherResult::Success {
                    city,
                    observation,
                    source: DataSource::Live,
                }
            }
            Err(e) => {
                error!("Weather fetch failed for {}: {}", city, e);
                WeatherResult::Failure { city, error: e }
            }
        }
    }

    async fn active_cities(&self, only: Option<City>) -> Vec<City> {
        let raw = match with_db(&self.db, |db| db.active_cities()).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Error getting active subscription cities: {}", e);
                return vec![];
            }
        };

        let cities: Vec<City> = raw
            .iter()
            .filter_map(|name| match City::try_from(name.as_str()) {
                Ok(city) => Some(city),
                Err(e) => {
                    warn!("Skipping subscriptions with {}", e);
                    None
                }
            })
            .filter(|city| only.is_none_or(|wanted| wanted == *city))
            .collect();

        info!(
            "Found {} unique cities with active subscriptions: {:?}",
            cities.len(),
            cities.iter().map(City::as_str).collect::<Vec<_>>()
        );
        cities
    }

    async fn cached(&self, city: City, now: DateTime<Utc>) -> Option<Observation> {
        let cutoff = format_timestamp(now - self.cache_window);
        let lookup = with_db(&self.db, move |db| db.latest_snapshot_since(city.as_str(), &cutoff));

        match lookup.await {
            Ok(Some(row)) => {
                info!("Using cached weather data for {} (captured at {})", city, row.captured_at);
                // Snapshots have no feels-like column; reuse the temperature.
                Some(Observation {
                    temperature: row.temperature,
                    humidity: row.humidity,
                    conditions: row.conditions,
                    feels_like: row.temperature,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Cache lookup failed for {}, treating as miss: {}", city, e);
                None
            }
        }
    }
}
