//! The daily report pipeline.
//!
//! `resolver` turns active subscriptions into per-city weather (cache first,
//! provider second), `notifier` mails each subscriber, `pipeline` wraps both
//! behind a run lock and `scheduler` fires it once a day.

pub mod mailer;
pub mod notifier;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use mailer::{EmailMessage, HttpMailer, LogMailer, Mailer};
pub use notifier::{DispatchReport, Notifier};
pub use pipeline::{PipelineBusy, ReportPipeline};
pub use resolver::{DEFAULT_CACHE_WINDOW_MINUTES, WeatherResolver};
pub use scheduler::{next_run_after, parse_report_time, run_daily_loop};
pub use template::escape_html;

use std::sync::Arc;

use anyhow::Context;
use weathermail_db::Database;

/// Run a blocking DB call off the async runtime.
pub(crate) async fn with_db<F, T>(db: &Arc<Database>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .context("blocking database task failed")?
}
