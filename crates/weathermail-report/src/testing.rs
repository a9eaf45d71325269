//! Recording fakes for the provider and mail seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use weathermail_db::Database;
use weathermail_weather::{FetchError, Observation, WeatherSource};

use crate::mailer::{EmailMessage, Mailer};

#[derive(Debug, Default)]
pub struct FakeSource {
    responses: Mutex<HashMap<String, Result<Observation, FetchError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn respond(&self, city: &str, response: Result<Observation, FetchError>) {
        self.responses.lock().unwrap().insert(city.to_string(), response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherSource for FakeSource {
    async fn fetch(&self, city: &str) -> Result<Observation, FetchError> {
        self.calls.lock().unwrap().push(city.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(city)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound(city.to_string())))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.to).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.failing.lock().unwrap().contains(&message.to) {
            return Err(anyhow!("SMTP refused {}", message.to));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn observation(temperature: f64, humidity: u8, conditions: &str) -> Observation {
    Observation {
        temperature,
        humidity,
        conditions: conditions.to_string(),
        feels_like: temperature,
    }
}

/// Creates `user_id` (if needed) and an active subscription for it.
pub fn subscribe(db: &Database, user_id: &str, email: &str, city: &str) {
    if db.get_user_by_id(user_id).unwrap().is_none() {
        db.create_user(user_id, user_id, &format!("{user_id}@accounts.test"), "hash")
            .unwrap();
    }
    db.insert_subscription(user_id, email, city, "2025-01-01 00:00:00")
        .unwrap();
}
