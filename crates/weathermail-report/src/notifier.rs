use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use weathermail_db::Database;
use weathermail_types::City;
use weathermail_weather::WeatherResult;

use crate::mailer::Mailer;
use crate::with_db;
use crate::template::render_daily_report;

/// Aggregate outcome of one dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    pub summary: String,
}

impl DispatchReport {
    fn new(cities: usize, sent: usize, failed: usize) -> Self {
        Self {
            sent,
            failed,
            summary: format!("Processed {cities} cities. Sent: {sent}, Failed: {failed}"),
        }
    }
}

pub struct Notifier {
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Sends one report per active subscriber of every successfully resolved
    /// city. Failed cities contribute no emails and are not counted as failed
    /// sends; a failed send is counted and the loop continues.
    pub async fn send_daily_reports(&self, results: &BTreeMap<City, WeatherResult>) -> DispatchReport {
        let mut sent = 0;
        let mut failed = 0;

        for (city, result) in results {
            let observation = match result {
                WeatherResult::Success { observation, .. } => observation,
                WeatherResult::Failure { error, .. } => {
                    error!("Weather data failed for {}: {}", city, error);
                    continue;
                }
            };

            info!(
                "Processing {}: {}°C, {}",
                city, observation.temperature, observation.conditions
            );

            let city_name = city.as_str();
            let lookup = with_db(&self.db, move |db| db.active_subscriptions_for_city(city_name));
            let subscribers = match lookup.await {
                Ok(subscribers) => subscribers,
                Err(e) => {
                    error!("Could not load subscribers for {}: {}", city, e);
                    continue;
                }
            };
            info!("Found {} subscribers for {}", subscribers.len(), city);

            for subscription in &subscribers {
                let message = render_daily_report(&subscription.email, *city, observation);
                match self.mailer.send(&message).await {
                    Ok(()) => {
                        sent += 1;
                        info!("Email sent to {} for {}", subscription.email, city);
                    }
                    Err(e) => {
                        failed += 1;
                        error!("Failed to send email to {} for {}: {:#}", subscription.email, city, e);
                    }
                }
            }
        }

        let report = DispatchReport::new(results.len(), sent, failed);
        info!("{}", report.summary);
        report
    }
}
