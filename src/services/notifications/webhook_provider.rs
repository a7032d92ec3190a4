//! Webhook notification provider.
//!
//! POSTs the message as JSON to the destination URL using the shared
//! HTTP client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;

use super::provider::{NotificationMessage, NotificationResult, Notifier};
use crate::error::AppResult;
use crate::external::client::HTTP_CLIENT;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Webhook notification provider.
///
/// The destination address of a webhook subscription is the target URL.
pub struct WebhookProvider {
    timeout: Duration,
}

impl WebhookProvider {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for WebhookProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for WebhookProvider {
    async fn send(
        &self,
        destination: &str,
        message: &NotificationMessage,
    ) -> AppResult<NotificationResult> {
        let start = Instant::now();

        if let Err(e) = Url::parse(destination) {
            return Ok(NotificationResult {
                success: false,
                status_code: None,
                response: Some(format!("Invalid webhook URL '{}': {}", destination, e)),
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        let response = HTTP_CLIENT
            .post(destination)
            .timeout(self.timeout)
            .json(&json!({
                "subject": message.subject,
                "body": message.body,
            }))
            .send()
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                let success = resp.status().is_success();
                let response_text = resp.text().await.ok();

                Ok(NotificationResult {
                    success,
                    status_code: Some(status_code),
                    response: response_text,
                    duration_ms,
                })
            }
            // Transport errors are recorded, not raised; the caller decides
            // what a failed delivery means for its pass.
            Err(e) => Ok(NotificationResult {
                success: false,
                status_code: None,
                response: Some(e.to_string()),
                duration_ms,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reports_invalid_url_as_failure() {
        let provider = WebhookProvider::new();
        let message = NotificationMessage {
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        let result = provider.send("not a url", &message).await.unwrap();
        assert!(!result.success);
        assert!(result.status_code.is_none());
        assert!(result.response.unwrap().contains("Invalid webhook URL"));
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(WebhookProvider::new().name(), "webhook");
    }
}
