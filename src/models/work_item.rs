//! Scraped event models.
//!
//! A scraped event is the unit of work for the notification dispatcher:
//! collected once, matched against subscriptions once, then marked
//! processed. Processing is monotonic, a processed event never reverts.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// ScrapedEvent query model for SELECT operations
#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = crate::schema::scraped_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScrapedEvent {
    pub id: i32,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_processed: bool,
    pub created_at: NaiveDateTime,
}

/// NewScrapedEvent insert model for INSERT operations.
///
/// Inserts rely on the `(title, start_date)` unique constraint with
/// `ON CONFLICT DO NOTHING`, so re-collecting the same feed is idempotent.
#[derive(Debug, Insertable, Deserialize, Clone)]
#[diesel(table_name = crate::schema::scraped_events)]
pub struct NewScrapedEvent {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}
