//! # KitFlow Notify
//!
//! Outbound email through a transactional email HTTP API. Every notice
//! in the system flows through [`Mailer::send`], which applies the
//! bounded retry policy; callers decide whether a failure is fatal
//! (for the primary mutations here it never is).

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub mod templates;

/// Attempts made before a send is reported as failed.
const MAX_ATTEMPTS: u32 = 3;

/// Notification errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Email API rejected the message: status {status}")]
    Api { status: u16 },
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Mailer configuration, read from the environment by the binary.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Endpoint of the transactional email API.
    pub api_url: String,
    pub api_key: String,
    /// Sender identity, e.g. `"KitFlow" <no-reply@kitflow.example>`.
    pub from: String,
    /// Inbox receiving operator-facing notices (new requests, contact
    /// messages).
    pub shop_inbox: String,
}

#[derive(Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Email client with bounded retry: up to three attempts, linearly
/// increasing backoff between them.
///
/// Constructed without an endpoint (no `EMAIL_API_URL` configured) the
/// mailer logs each message instead of sending, so development setups
/// work without credentials.
pub struct Mailer {
    client: reqwest::Client,
    config: Option<MailerConfig>,
    shop_inbox: String,
    backoff_unit: Duration,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        let shop_inbox = config.shop_inbox.clone();
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            config: Some(config),
            shop_inbox,
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// A mailer that logs instead of sending.
    pub fn disabled(shop_inbox: impl Into<String>) -> Self {
        warn!("Email delivery is not configured; notices will only be logged");
        Self {
            client: reqwest::Client::new(),
            config: None,
            shop_inbox: shop_inbox.into(),
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// Sends one HTML email. Retries transport and server failures up to
    /// [`MAX_ATTEMPTS`] times, waiting `attempt × 1s` between tries.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> NotifyResult<()> {
        let Some(config) = &self.config else {
            info!(to, subject, "Email delivery disabled; skipping send");
            return Ok(());
        };

        let message = OutboundEmail {
            from: &config.from,
            to,
            subject,
            html,
        };

        let mut last_error = NotifyError::Network("no attempt made".to_string());
        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .client
                .post(&config.api_url)
                .bearer_auth(&config.api_key)
                .json(&message)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!(to, subject, attempt, "Email sent");
                    return Ok(());
                }
                Ok(response) => {
                    last_error = NotifyError::Api {
                        status: response.status().as_u16(),
                    };
                    warn!(to, attempt, status = response.status().as_u16(), "Email API error");
                }
                Err(e) => {
                    last_error = NotifyError::Network(e.to_string());
                    warn!(to, attempt, error = %e, "Email send failed");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(self.backoff_unit * attempt).await;
            }
        }

        Err(last_error)
    }

    /// Sends an operator-facing notice to the shop inbox.
    pub async fn send_to_shop(&self, subject: &str, html: &str) -> NotifyResult<()> {
        let inbox = self.shop_inbox.clone();
        self.send(&inbox, subject, html).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mailer_for(server: &MockServer) -> Mailer {
        let mut mailer = Mailer::new(MailerConfig {
            api_url: format!("{}/send", server.uri()),
            api_key: "test-key".to_string(),
            from: "\"KitFlow\" <no-reply@kitflow.example>".to_string(),
            shop_inbox: "shop@kitflow.example".to_string(),
        });
        mailer.backoff_unit = Duration::from_millis(5);
        mailer
    }

    #[tokio::test]
    async fn sends_once_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_partial_json(serde_json::json!({
                "to": "asha@example.com",
                "subject": "Hello"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = mailer_for(&server);
        mailer
            .send("asha@example.com", "Hello", "<p>Hi</p>")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn retries_three_times_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let mailer = mailer_for(&server);
        let result = mailer.send("asha@example.com", "Hello", "<p>Hi</p>").await;

        match result {
            Err(NotifyError::Api { status }) => assert_eq!(status, 500),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recovers_when_a_retry_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mailer = mailer_for(&server);
        mailer
            .send("asha@example.com", "Hello", "<p>Hi</p>")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn disabled_mailer_swallows_sends() {
        let mailer = Mailer::disabled("shop@kitflow.example");
        mailer
            .send("asha@example.com", "Hello", "<p>Hi</p>")
            .await
            .unwrap();
    }
}
