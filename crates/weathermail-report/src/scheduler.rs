use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveTime, Utc};
use tracing::{info, warn};

use crate::pipeline::ReportPipeline;

/// Background task that fires the report pipeline once a day at `at` (UTC).
///
/// Runs until the process exits. A tick that finds a manual run still in
/// flight is skipped, not queued.
pub async fn run_daily_loop(pipeline: Arc<ReportPipeline>, at: NaiveTime) {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, at);
        info!("Next daily weather report at {}", next);

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        match pipeline.run_once(None).await {
            Ok(report) => info!("Scheduled report finished: {}", report.summary),
            Err(e) => warn!("Scheduled report skipped: {}", e),
        }
    }
}

/// The first instant strictly after `now` whose UTC wall-clock time is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        return today;
    }
    now.date_naive()
        .checked_add_days(Days::new(1))
        .map(|tomorrow| tomorrow.and_time(at).and_utc())
        .unwrap_or(today)
}

/// Parses `HH:MM` (24-hour).
pub fn parse_report_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("Invalid report time '{raw}', expected HH:MM"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn later_today_when_time_not_reached() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 5, 30, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(7, 0)),
            Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn tomorrow_when_time_passed_or_exact() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 7, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(7, 0)),
            Utc.with_ymd_and_hms(2025, 7, 1, 7, 0, 0).unwrap()
        );

        let evening = Utc.with_ymd_and_hms(2025, 12, 31, 22, 0, 0).unwrap();
        assert_eq!(
            next_run_after(evening, at(7, 0)),
            Utc.with_ymd_and_hms(2026, 1, 1, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_report_time() {
        assert_eq!(parse_report_time("07:00").unwrap(), at(7, 0));
        assert_eq!(parse_report_time(" 19:30 ").unwrap(), at(19, 30));
        assert!(parse_report_time("7pm").is_err());
        assert!(parse_report_time("25:00").is_err());
    }
}
