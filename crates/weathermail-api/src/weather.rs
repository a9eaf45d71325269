use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;

use weathermail_db::parse_timestamp;
use weathermail_types::City;
use weathermail_types::api::{SnapshotView, WeatherHistoryResponse};

use crate::auth::AppState;
use crate::error::{ApiError, run_db};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// GET /api/weather/history/{city}: cached snapshots, newest first.
pub async fn history(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let city = City::try_from(city.as_str()).map_err(|e| ApiError::Validation(e.to_string()))?;
    let limit = query.limit.clamp(1, 100);

    let rows = run_db(&state.db, move |db| db.recent_snapshots(city.as_str(), limit)).await?;

    let snapshots: Vec<SnapshotView> = rows
        .into_iter()
        .map(|row| SnapshotView {
            captured_at: parse_timestamp(&row.captured_at).unwrap_or_else(|e| {
                warn!("Snapshot {}: {}", row.id, e);
                chrono::DateTime::default()
            }),
            id: row.id,
            city,
            temperature: row.temperature,
            humidity: row.humidity,
            conditions: row.conditions,
        })
        .collect();

    Ok(Json(WeatherHistoryResponse {
        city,
        count: snapshots.len(),
        snapshots,
    }))
}
