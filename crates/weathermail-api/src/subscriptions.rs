use axum::{
    Extension, Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use weathermail_db::models::SubscriptionRow;
use weathermail_db::{SubscriptionInsert, format_timestamp, parse_timestamp};
use weathermail_types::City;
use weathermail_types::api::{
    Claims, SubscribeResponse, SubscriptionListResponse, SubscriptionQuery, SubscriptionRequest,
    SubscriptionView, UnsubscribeResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, run_db};
use crate::validation::require_email;

/// POST /api/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::Validation("Invalid JSON data".into()))?;

    let (email, city) = parse_subscribe(&req)?;
    let subscription_id = subscribe_user(&state, claims.sub, &email, city).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            message: "Successfully subscribed".into(),
            subscription_id,
            user_id: claims.sub,
            email,
            city,
        }),
    ))
}

/// POST /api/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::Validation("Invalid JSON data".into()))?;

    let (email, city) = parse_unsubscribe(&req)?;
    unsubscribe_user(&state, claims.sub, &email, city).await?;

    Ok(Json(UnsubscribeResponse {
        message: "Successfully unsubscribed".into(),
        user_id: claims.sub,
        email,
        city,
    }))
}

/// GET /api/subscriptions?email=
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriptions = list_for_user(&state, claims.sub, query.email).await?;

    Ok(Json(SubscriptionListResponse {
        count: subscriptions.len(),
        subscriptions,
    }))
}

pub(crate) fn parse_subscribe(req: &SubscriptionRequest) -> Result<(String, City), ApiError> {
    let email = require_email(req.email.as_deref())?;
    let city = require_city(req.city.as_deref())?;
    let city = City::try_from(city)
        .map_err(|_| ApiError::Validation("City not in allowed list".into()))?;
    Ok((email, city))
}

/// Unsubscribe only needs both fields present; an address or city that was
/// never subscribed simply matches no row.
pub(crate) fn parse_unsubscribe(req: &SubscriptionRequest) -> Result<(String, City), ApiError> {
    let email = req
        .email
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".into()))?;
    let city = require_city(req.city.as_deref())?;
    let city = City::try_from(city).map_err(|_| subscription_not_found())?;
    Ok((email.to_string(), city))
}

pub(crate) async fn subscribe_user(
    state: &AppState,
    user_id: Uuid,
    email: &str,
    city: City,
) -> Result<i64, ApiError> {
    let (uid, mail) = (user_id.to_string(), email.to_string());
    let inserted = run_db(&state.db, move |db| {
        db.insert_subscription(&uid, &mail, city.as_str(), &format_timestamp(Utc::now()))
    })
    .await?;

    match inserted {
        SubscriptionInsert::Created(id) => {
            info!("User {} subscribed {} to {}", user_id, email, city);
            Ok(id)
        }
        SubscriptionInsert::Duplicate => Err(ApiError::Conflict(
            "You are already subscribed to this city".into(),
        )),
    }
}

pub(crate) async fn unsubscribe_user(
    state: &AppState,
    user_id: Uuid,
    email: &str,
    city: City,
) -> Result<(), ApiError> {
    let (uid, mail) = (user_id.to_string(), email.to_string());
    let removed =
        run_db(&state.db, move |db| db.delete_subscription(&uid, &mail, city.as_str())).await?;

    if removed == 0 {
        return Err(subscription_not_found());
    }
    info!("User {} unsubscribed {} from {}", user_id, email, city);
    Ok(())
}

pub(crate) async fn list_for_user(
    state: &AppState,
    user_id: Uuid,
    email: Option<String>,
) -> Result<Vec<SubscriptionView>, ApiError> {
    let uid = user_id.to_string();
    let rows = run_db(&state.db, move |db| db.list_subscriptions(&uid, email.as_deref())).await?;

    Ok(rows.into_iter().filter_map(to_view).collect())
}

fn require_city(city: Option<&str>) -> Result<&str, ApiError> {
    city.filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("City is required".into()))
}

fn subscription_not_found() -> ApiError {
    ApiError::NotFound("Subscription not found for this user, email, and city combination".into())
}

fn to_view(row: SubscriptionRow) -> Option<SubscriptionView> {
    let city = match City::try_from(row.city.as_str()) {
        Ok(city) => city,
        Err(e) => {
            warn!("Subscription {} has {}", row.id, e);
            return None;
        }
    };

    Some(SubscriptionView {
        id: row.id,
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user_id '{}' on subscription {}: {}", row.user_id, row.id, e);
            Uuid::default()
        }),
        email: row.email,
        city,
        subscribed_at: parse_timestamp(&row.subscribed_at).unwrap_or_else(|e| {
            warn!("Subscription {}: {}", row.id, e);
            chrono::DateTime::default()
        }),
        active: row.active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(email: Option<&str>, city: Option<&str>) -> SubscriptionRequest {
        SubscriptionRequest {
            email: email.map(str::to_string),
            city: city.map(str::to_string),
        }
    }

    #[test]
    fn subscribe_validation_messages() {
        let msg = |r: SubscriptionRequest| parse_subscribe(&r).unwrap_err().to_string();

        assert_eq!(msg(req(None, Some("London"))), "Email is required");
        assert_eq!(msg(req(Some("bad"), Some("London"))), "Invalid email format");
        assert_eq!(msg(req(Some("a@b.co"), None)), "City is required");
        assert_eq!(msg(req(Some("a@b.co"), Some("Paris"))), "City not in allowed list");

        let (email, city) = parse_subscribe(&req(Some("a@b.co"), Some("New York"))).unwrap();
        assert_eq!(email, "a@b.co");
        assert_eq!(city, City::NewYork);
    }

    #[test]
    fn unsubscribe_unknown_city_is_not_found() {
        let err = parse_unsubscribe(&req(Some("a@b.co"), Some("Paris"))).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = parse_unsubscribe(&req(Some("a@b.co"), None)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
