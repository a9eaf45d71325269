use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::{info, warn};

use weathermail_types::api::{Claims, RunReportResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /api/reports/run: run the daily pipeline now. Operators only (403
/// otherwise); refused with 409 while another run is in flight.
pub async fn run_now(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.admin_users.iter().any(|name| *name == claims.username) {
        warn!("Report run refused for non-operator {}", claims.username);
        return Err(ApiError::Forbidden(
            "Only operators can trigger a report run".into(),
        ));
    }

    info!("Manual report run requested by {}", claims.username);

    let report = state
        .pipeline
        .run_once(None)
        .await
        .map_err(|busy| ApiError::Conflict(busy.to_string()))?;

    Ok(Json(RunReportResponse {
        sent: report.sent,
        failed: report.failed,
        summary: report.summary,
    }))
}
