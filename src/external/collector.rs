//! HTTP-backed event feed collector.
//!
//! Fetches a JSON feed of events and saves whatever is new through the
//! scraped-event repository. Duplicate events are deduplicated by the
//! `(title, start_date)` constraint, so repeated passes over an unchanged
//! feed save nothing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::config::CollectorConfig;
use crate::error::{AppError, AppResult};
use crate::external::client::HTTP_CLIENT;
use crate::jobs::tasks::{CollectorReport, EventCollector};
use crate::models::NewScrapedEvent;
use crate::repositories::ScrapedEventRepository;

/// One event as published by the feed.
#[derive(Debug, Deserialize)]
pub struct FeedEvent {
    pub title: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Collector that pulls the configured JSON feed over HTTP.
pub struct HttpEventCollector {
    source_url: String,
    timeout: Duration,
    events: ScrapedEventRepository,
}

impl HttpEventCollector {
    pub fn new(config: &CollectorConfig, events: ScrapedEventRepository) -> Self {
        Self {
            source_url: config.source_url.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            events,
        }
    }
}

#[async_trait]
impl EventCollector for HttpEventCollector {
    async fn collect(&self) -> AppResult<CollectorReport> {
        let response = HTTP_CLIENT
            .get(&self.source_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::External {
                service: "event feed".to_string(),
                source: anyhow::Error::from(e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::External {
                service: "event feed".to_string(),
                source: anyhow::Error::msg(format!(
                    "Feed request failed with status {}",
                    response.status()
                )),
            });
        }

        let feed: Vec<FeedEvent> = response.json().await.map_err(|e| AppError::External {
            service: "event feed".to_string(),
            source: anyhow::Error::from(e),
        })?;

        let events_fetched = feed.len() as i32;
        let new_events: Vec<NewScrapedEvent> = feed
            .into_iter()
            .map(|event| NewScrapedEvent {
                title: event.title,
                start_date: event.start_date,
                end_date: event.end_date,
            })
            .collect();

        let events_saved = self.events.insert_new_events(&new_events).await? as i32;

        Ok(CollectorReport {
            events_fetched,
            events_saved,
            payload: json!({
                "events_fetched": events_fetched,
                "events_saved": events_saved,
                "source_url": self.source_url,
            }),
        })
    }
}
