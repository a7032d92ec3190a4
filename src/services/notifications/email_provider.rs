//! Email notification provider backed by an async SMTP transport.

use std::time::Instant;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::provider::{NotificationMessage, NotificationResult, Notifier};
use crate::config::settings::SmtpConfig;
use crate::error::{AppError, AppResult};

/// Sends plain-text mail through a configured SMTP relay.
pub struct EmailProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailProvider {
    /// Builds the provider from SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the from-address does not parse or
    /// the relay host is rejected by the transport builder.
    pub fn new(config: &SmtpConfig) -> AppResult<Self> {
        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation {
                field: "notifications.smtp.from_address".to_string(),
                reason: format!("Invalid from address '{}': {}", config.from_address, e),
            })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| AppError::Configuration {
                key: "notifications.smtp.host".to_string(),
                source: anyhow::Error::from(e),
            })?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for EmailProvider {
    async fn send(
        &self,
        destination: &str,
        message: &NotificationMessage,
    ) -> AppResult<NotificationResult> {
        let start = Instant::now();

        let to = match destination.parse::<Mailbox>() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                // An unparseable recipient is a delivery failure for this
                // destination, not an abort of the whole pass.
                return Ok(NotificationResult {
                    success: false,
                    status_code: None,
                    response: Some(format!("Invalid recipient '{}': {}", destination, e)),
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }
        };

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        let result = self.transport.send(email).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => Ok(NotificationResult {
                success: response.is_positive(),
                status_code: None,
                response: Some(response.code().to_string()),
                duration_ms,
            }),
            Err(e) => Ok(NotificationResult {
                success: false,
                status_code: None,
                response: Some(e.to_string()),
                duration_ms,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
