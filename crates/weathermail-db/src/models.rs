/// Database row types. These map directly to SQLite rows.
/// Distinct from the weathermail-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct SubscriptionRow {
    pub id: i64,
    pub user_id: String,
    pub email: String,
    pub city: String,
    pub subscribed_at: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub id: i64,
    pub city: String,
    pub temperature: f64,
    pub humidity: u8,
    pub conditions: String,
    pub captured_at: String,
}

/// Per-city count of active subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityCount {
    pub city: String,
    pub subscribers: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionStats {
    pub total: i64,
    pub active: i64,
    pub by_city: Vec<CityCount>,
}
