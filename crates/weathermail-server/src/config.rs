use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveTime;

use weathermail_report::{DEFAULT_CACHE_WINDOW_MINUTES, parse_report_time};
use weathermail_weather::DEFAULT_BASE_URL;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// `None` when unset or a known placeholder.
    pub jwt_secret: Option<String>,
    pub weather_api_key: Option<String>,
    pub weather_api_url: String,
    pub cache_window_minutes: i64,
    pub report_time: NaiveTime,
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
    pub mail_from: String,
    /// Usernames allowed to trigger `POST /api/reports/run`.
    pub admin_users: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match non_empty("WEATHERMAIL_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("WEATHERMAIL_PORT '{raw}' is not a port number"))?,
            None => 3000,
        };

        let cache_window_minutes = match non_empty("WEATHERMAIL_CACHE_WINDOW_MINUTES") {
            Some(raw) => raw.parse().with_context(|| {
                format!("WEATHERMAIL_CACHE_WINDOW_MINUTES '{raw}' is not a whole number")
            })?,
            None => DEFAULT_CACHE_WINDOW_MINUTES,
        };
        anyhow::ensure!(
            cache_window_minutes > 0,
            "WEATHERMAIL_CACHE_WINDOW_MINUTES must be positive"
        );

        let report_time = parse_report_time(
            &non_empty("WEATHERMAIL_REPORT_TIME").unwrap_or_else(|| "07:00".into()),
        )?;

        let jwt_secret = non_empty("WEATHERMAIL_JWT_SECRET")
            .filter(|s| !PLACEHOLDER_SECRETS.contains(&s.as_str()));

        Ok(Self {
            host: non_empty("WEATHERMAIL_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: non_empty("WEATHERMAIL_DB_PATH")
                .unwrap_or_else(|| "weathermail.db".into())
                .into(),
            jwt_secret,
            weather_api_key: non_empty("WEATHER_API_KEY"),
            weather_api_url: non_empty("WEATHER_API_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            cache_window_minutes,
            report_time,
            mail_api_url: non_empty("MAIL_API_URL"),
            mail_api_token: non_empty("MAIL_API_TOKEN"),
            mail_from: non_empty("MAIL_FROM").unwrap_or_else(|| "weather@localhost".into()),
            admin_users: non_empty("WEATHERMAIL_ADMIN_USERS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.host, "0.0.0.0");
        assert_eq!(c.port, 3000);
        assert_eq!(c.db_path, PathBuf::from("weathermail.db"));
        assert_eq!(c.cache_window_minutes, 180);
        assert_eq!(c.report_time, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(c.weather_api_url, DEFAULT_BASE_URL);
        assert_eq!(c.mail_from, "weather@localhost");
        assert!(c.jwt_secret.is_none());
        assert!(c.weather_api_key.is_none());
        assert!(c.mail_api_url.is_none());
        assert!(c.admin_users.is_empty());
    }

    #[test]
    fn admin_users_are_a_comma_list() {
        let c = config(&[("WEATHERMAIL_ADMIN_USERS", " ops, alice ,,")]).unwrap();
        assert_eq!(c.admin_users, vec!["ops".to_string(), "alice".to_string()]);
    }

    #[test]
    fn placeholder_secrets_are_discarded() {
        assert!(config(&[("WEATHERMAIL_JWT_SECRET", "dev-secret-change-me")])
            .unwrap()
            .jwt_secret
            .is_none());
        assert!(config(&[("WEATHERMAIL_JWT_SECRET", "  ")]).unwrap().jwt_secret.is_none());
        assert_eq!(
            config(&[("WEATHERMAIL_JWT_SECRET", "s3cr3t-value")])
                .unwrap()
                .jwt_secret
                .as_deref(),
            Some("s3cr3t-value")
        );
    }

    #[test]
    fn overrides_and_bad_values() {
        let c = config(&[
            ("WEATHERMAIL_PORT", "8080"),
            ("WEATHERMAIL_CACHE_WINDOW_MINUTES", "60"),
            ("WEATHERMAIL_REPORT_TIME", "18:45"),
            ("WEATHER_API_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.cache_window_minutes, 60);
        assert_eq!(c.report_time, NaiveTime::from_hms_opt(18, 45, 0).unwrap());
        assert_eq!(c.weather_api_key.as_deref(), Some("k"));

        assert!(config(&[("WEATHERMAIL_PORT", "http")]).is_err());
        assert!(config(&[("WEATHERMAIL_CACHE_WINDOW_MINUTES", "0")]).is_err());
        assert!(config(&[("WEATHERMAIL_REPORT_TIME", "noon")]).is_err());
    }
}
