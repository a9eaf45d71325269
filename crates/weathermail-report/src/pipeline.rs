use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use weathermail_types::City;

use crate::notifier::{DispatchReport, Notifier};
use crate::resolver::WeatherResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("A weather report run is already in progress")]
pub struct PipelineBusy;

/// Resolve-then-notify, with at most one run in flight. A second trigger
/// while a run holds the lock is turned away rather than queued.
pub struct ReportPipeline {
    resolver: WeatherResolver,
    notifier: Notifier,
    run_lock: Mutex<()>,
}

impl ReportPipeline {
    pub fn new(resolver: WeatherResolver, notifier: Notifier) -> Self {
        Self {
            resolver,
            notifier,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run_once(&self, only: Option<City>) -> Result<DispatchReport, PipelineBusy> {
        self.run_at(Utc::now(), only).await
    }

    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        only: Option<City>,
    ) -> Result<DispatchReport, PipelineBusy> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Report run requested while another is in progress; skipping");
            return Err(PipelineBusy);
        };

        info!("Starting daily weather report run");
        let results = self.resolver.resolve_at(now, only).await;
        let report = self.notifier.send_daily_reports(&results).await;
        info!("Report run completed: {}", report.summary);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DEFAULT_CACHE_WINDOW_MINUTES;
    use crate::testing::{FakeSource, RecordingMailer, observation, subscribe};
    use chrono::Duration;
    use std::sync::Arc;
    use weathermail_db::Database;
    use weathermail_weather::FetchError;

    struct Harness {
        db: Arc<Database>,
        source: Arc<FakeSource>,
        mailer: Arc<RecordingMailer>,
        pipeline: ReportPipeline,
    }

    fn harness() -> Harness {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let source = Arc::new(FakeSource::default());
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = ReportPipeline::new(
            WeatherResolver::new(
                db.clone(),
                source.clone(),
                Duration::minutes(DEFAULT_CACHE_WINDOW_MINUTES),
            ),
            Notifier::new(db.clone(), mailer.clone()),
        );
        Harness {
            db,
            source,
            mailer,
            pipeline,
        }
    }

    #[tokio::test]
    async fn london_end_to_end() {
        let h = harness();
        subscribe(&h.db, "u1", "one@mail.test", "London");
        subscribe(&h.db, "u2", "two@mail.test", "London");
        h.source.respond("London", Ok(observation(18.3, 70, "clear sky")));

        let report = h.pipeline.run_once(None).await.unwrap();

        assert_eq!(report.summary, "Processed 1 cities. Sent: 2, Failed: 0");
        assert_eq!(h.mailer.recipients(), vec!["one@mail.test", "two@mail.test"]);
        for message in h.mailer.sent() {
            assert!(message.text_body.contains("18.3"));
            assert!(message.text_body.contains("clear sky"));
            assert!(message.text_body.contains("70%"));
        }
    }

    #[tokio::test]
    async fn city_unknown_upstream_gets_no_mail() {
        let h = harness();
        subscribe(&h.db, "u1", "one@mail.test", "Lahore");
        h.source.respond("Lahore", Err(FetchError::NotFound("Lahore".into())));

        let report = h.pipeline.run_once(None).await.unwrap();

        assert!(h.mailer.sent().is_empty());
        assert_eq!((report.sent, report.failed), (0, 0));
        assert_eq!(report.summary, "Processed 1 cities. Sent: 0, Failed: 0");
    }

    #[tokio::test]
    async fn second_run_within_window_reuses_cache() {
        let h = harness();
        subscribe(&h.db, "u1", "one@mail.test", "Tokyo");
        h.source.respond("Tokyo", Ok(observation(26.0, 60, "few clouds")));

        let start = Utc::now();
        h.pipeline.run_at(start, None).await.unwrap();
        h.pipeline.run_at(start + Duration::hours(1), None).await.unwrap();

        assert_eq!(h.source.calls().len(), 1);
        assert_eq!(h.mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn overlapping_run_is_rejected() {
        let h = harness();
        subscribe(&h.db, "u1", "one@mail.test", "Tokyo");

        let held = h.pipeline.run_lock.try_lock().unwrap();
        assert_eq!(h.pipeline.run_once(None).await, Err(PipelineBusy));
        assert!(h.source.calls().is_empty());
        drop(held);

        assert!(h.pipeline.run_once(None).await.is_ok());
    }
}
