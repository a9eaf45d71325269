use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, subscriptions, weather snapshots)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE subscriptions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                email           TEXT NOT NULL,
                city            TEXT NOT NULL,
                subscribed_at   TEXT NOT NULL DEFAULT (datetime('now')),
                active          INTEGER NOT NULL DEFAULT 1,
                UNIQUE(user_id, city)
            );

            CREATE INDEX idx_subscriptions_city
                ON subscriptions(city, active);

            -- Append-only; read newest first
            CREATE TABLE weather_snapshots (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                city            TEXT NOT NULL,
                temperature     REAL NOT NULL,
                humidity        INTEGER NOT NULL,
                conditions      TEXT NOT NULL,
                captured_at     TEXT NOT NULL
            );

            CREATE INDEX idx_snapshots_city_captured
                ON weather_snapshots(city, captured_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
