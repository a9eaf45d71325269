use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::city::City;

// -- Session claims --

/// JWT claims carried in the session cookie or the Bearer header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Subscriptions --

/// Body of both subscribe and unsubscribe. Fields are optional so a missing
/// one is reported as a validation error rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionRequest {
    pub email: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: String,
    pub subscription_id: i64,
    pub user_id: Uuid,
    pub email: String,
    pub city: City,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub message: String,
    pub user_id: Uuid,
    pub email: String,
    pub city: City,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: i64,
    pub user_id: Uuid,
    pub email: String,
    pub city: City,
    pub subscribed_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionListResponse {
    pub subscriptions: Vec<SubscriptionView>,
    pub count: usize,
}

// -- Weather history --

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub id: i64,
    pub city: City,
    pub temperature: f64,
    pub humidity: u8,
    pub conditions: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WeatherHistoryResponse {
    pub city: City,
    pub snapshots: Vec<SnapshotView>,
    pub count: usize,
}

// -- Reports --

#[derive(Debug, Serialize)]
pub struct RunReportResponse {
    pub sent: usize,
    pub failed: usize,
    pub summary: String,
}
