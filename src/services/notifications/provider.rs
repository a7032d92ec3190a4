//! Core notification provider trait and types.
//!
//! The dispatcher and the ops alerting path talk to concrete transports
//! (email, webhook) only through this abstraction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::ChannelType;

/// Message to be sent via a notification provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Message subject
    pub subject: String,
    /// Message body (plain text)
    pub body: String,
}

/// Result of a notification send attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    /// Whether the send was successful
    pub success: bool,
    /// HTTP status code or provider-specific status
    pub status_code: Option<u16>,
    /// Response body or error message
    pub response: Option<String>,
    /// Time taken for the operation in milliseconds
    pub duration_ms: u64,
}

/// Trait for notification transports.
///
/// Implementations report delivery failures through the returned
/// `NotificationResult` rather than an `Err`; an `Err` means the send could
/// not even be attempted (bad destination, broken configuration).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a message to a single destination address.
    async fn send(
        &self,
        destination: &str,
        message: &NotificationMessage,
    ) -> AppResult<NotificationResult>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Maps subscription channel types to their transport.
#[derive(Default, Clone)]
pub struct NotifierRegistry {
    providers: HashMap<ChannelType, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn register(&mut self, channel: ChannelType, provider: Arc<dyn Notifier>) -> &mut Self {
        self.providers.insert(channel, provider);
        self
    }

    pub fn get(&self, channel: ChannelType) -> Option<Arc<dyn Notifier>> {
        self.providers.get(&channel).cloned()
    }
}
