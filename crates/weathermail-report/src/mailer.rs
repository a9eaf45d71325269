use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

/// A rendered email, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Delivers mail through a transactional-email HTTP API
/// (`POST {endpoint}` with a JSON body and optional Bearer token).
pub struct HttpMailer {
    http: Client,
    endpoint: String,
    token: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str, token: Option<String>, from: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            token,
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = SendEmailRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html_body,
            text: &message.text_body,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = request
            .send()
            .await
            .with_context(|| format!("Failed to reach mail API for {}", message.to))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Mail API returned {}: {}", status, text));
        }

        Ok(())
    }
}

/// Writes messages to the log instead of sending them. Used when no mail
/// API is configured.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: &str) -> Self {
        Self {
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "Mail transport not configured, logging message:\n{}",
            message.text_body
        );
        Ok(())
    }
}
