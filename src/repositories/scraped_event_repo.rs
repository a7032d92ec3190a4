//! Scraped event repository.
//!
//! Inserts from the collector are idempotent via the `(title, start_date)`
//! unique constraint; the dispatcher's only mutation is the monotonic
//! `is_processed` flag.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::pooled_connection::bb8::PooledConnection;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{NewScrapedEvent, ScrapedEvent};
use crate::schema::scraped_events;
use crate::services::notifications::{WorkItem, WorkItemSource};

#[derive(Clone)]
pub struct ScrapedEventRepository {
    pool: AsyncDbPool,
}

impl ScrapedEventRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> AppResult<PooledConnection<'_, diesel_async::AsyncPgConnection>> {
        self.pool.get().await.map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })
    }

    /// Inserts collected events, silently skipping ones already present.
    /// Returns how many rows were actually inserted.
    pub async fn insert_new_events(&self, events: &[NewScrapedEvent]) -> AppResult<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn().await?;
        diesel::insert_into(scraped_events::table)
            .values(events)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Unprocessed events in insertion order, bounded by `limit`.
    pub async fn list_unprocessed_rows(&self, limit: i64) -> AppResult<Vec<ScrapedEvent>> {
        let mut conn = self.conn().await?;
        scraped_events::table
            .filter(scraped_events::is_processed.eq(false))
            .order(scraped_events::id.asc())
            .limit(limit)
            .select(ScrapedEvent::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Flags one event as processed. Monotonic: there is no unset path.
    pub async fn mark_processed_row(&self, event_id: i32) -> AppResult<()> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(scraped_events::table.find(event_id))
            .set(scraped_events::is_processed.eq(true))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        if updated == 0 {
            return Err(AppError::NotFound {
                entity: "ScrapedEvent".to_string(),
                field: "id".to_string(),
                value: event_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WorkItemSource for ScrapedEventRepository {
    async fn list_unprocessed(&self, limit: i64) -> AppResult<Vec<WorkItem>> {
        let rows = self.list_unprocessed_rows(limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| WorkItem {
                id: row.id,
                title: row.title,
            })
            .collect())
    }

    async fn mark_processed(&self, id: i32) -> AppResult<()> {
        self.mark_processed_row(id).await
    }
}
