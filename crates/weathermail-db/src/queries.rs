use crate::Database;
use crate::models::{CityCount, SnapshotRow, SubscriptionRow, SubscriptionStats, UserRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Row};

/// Outcome of inserting a user under the username and email constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInsert {
    Created,
    UsernameTaken,
    EmailTaken,
}

/// Outcome of inserting a subscription under the (user, city) constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionInsert {
    Created(i64),
    Duplicate,
}

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, email, city, subscribed_at, active";
const SNAPSHOT_COLUMNS: &str = "id, city, temperature, humidity, conditions, captured_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserInsert> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            );
            match inserted {
                Ok(_) => Ok(UserInsert::Created),
                Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
                    if err.code == ErrorCode::ConstraintViolation
                        && msg.contains("users.username") =>
                {
                    Ok(UserInsert::UsernameTaken)
                }
                Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
                    if err.code == ErrorCode::ConstraintViolation && msg.contains("users.email") =>
                {
                    Ok(UserInsert::EmailTaken)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn email_taken(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1",
                [email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Subscriptions --

    pub fn insert_subscription(
        &self,
        user_id: &str,
        email: &str,
        city: &str,
        subscribed_at: &str,
    ) -> Result<SubscriptionInsert> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO subscriptions (user_id, email, city, subscribed_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, city) DO NOTHING",
                (user_id, email, city, subscribed_at),
            )?;

            if inserted == 0 {
                Ok(SubscriptionInsert::Duplicate)
            } else {
                Ok(SubscriptionInsert::Created(conn.last_insert_rowid()))
            }
        })
    }

    /// Hard-deletes the row matching the exact (user, email, city) triple.
    /// Returns the number of rows removed (0 or 1).
    pub fn delete_subscription(&self, user_id: &str, email: &str, city: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM subscriptions WHERE user_id = ?1 AND email = ?2 AND city = ?3",
                (user_id, email, city),
            )?;
            Ok(removed)
        })
    }

    pub fn list_subscriptions(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<Vec<SubscriptionRow>> {
        self.with_conn(|conn| {
            let rows = match email {
                Some(email) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                         WHERE user_id = ?1 AND email = ?2
                         ORDER BY subscribed_at DESC, id DESC"
                    ))?;
                    stmt.query_map((user_id, email), subscription_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                         WHERE user_id = ?1
                         ORDER BY subscribed_at DESC, id DESC"
                    ))?;
                    stmt.query_map([user_id], subscription_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    /// Distinct cities with at least one active subscription.
    pub fn active_cities(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT city FROM subscriptions WHERE active = 1 ORDER BY city",
            )?;
            let cities = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(cities)
        })
    }

    pub fn active_subscriptions_for_city(&self, city: &str) -> Result<Vec<SubscriptionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE city = ?1 AND active = 1
                 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([city], subscription_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn subscription_stats(&self) -> Result<SubscriptionStats> {
        self.with_conn(|conn| {
            let (total, active): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(active), 0) FROM subscriptions",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut stmt = conn.prepare(
                "SELECT city, COUNT(*) FROM subscriptions
                 WHERE active = 1
                 GROUP BY city
                 ORDER BY city",
            )?;
            let by_city = stmt
                .query_map([], |row| {
                    Ok(CityCount {
                        city: row.get(0)?,
                        subscribers: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(SubscriptionStats {
                total,
                active,
                by_city,
            })
        })
    }

    // -- Weather snapshots --

    pub fn insert_snapshot(
        &self,
        city: &str,
        temperature: f64,
        humidity: u8,
        conditions: &str,
        captured_at: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO weather_snapshots (city, temperature, humidity, conditions, captured_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![city, temperature, humidity, conditions, captured_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest snapshot for `city` captured at or after `cutoff`.
    pub fn latest_snapshot_since(&self, city: &str, cutoff: &str) -> Result<Option<SnapshotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SNAPSHOT_COLUMNS} FROM weather_snapshots
                 WHERE city = ?1 AND captured_at >= ?2
                 ORDER BY captured_at DESC, id DESC
                 LIMIT 1"
            ))?;
            let row = stmt.query_row((city, cutoff), snapshot_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn recent_snapshots(&self, city: &str, limit: u32) -> Result<Vec<SnapshotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SNAPSHOT_COLUMNS} FROM weather_snapshots
                 WHERE city = ?1
                 ORDER BY captured_at DESC, id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![city, limit], snapshot_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<SubscriptionRow> {
    Ok(SubscriptionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        city: row.get(3)?,
        subscribed_at: row.get(4)?,
        active: row.get(5)?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        id: row.get(0)?,
        city: row.get(1)?,
        temperature: row.get(2)?,
        humidity: row.get(3)?,
        conditions: row.get(4)?,
        captured_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
