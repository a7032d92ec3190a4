//! Notification subscription repository.
//!
//! The write paths enforce the destination-address invariant: a channel
//! that delivers to a direct address rejects rows without one.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::pooled_connection::bb8::PooledConnection;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ChannelType, NewNotifySetting, NotifySetting, UpdateNotifySetting};
use crate::schema::notify_settings;
use crate::services::notifications::{Subscription, SubscriptionSource};

/// Rejects an empty or missing destination for channels that need one.
fn validate_destination(channel: ChannelType, destination: Option<&str>) -> AppResult<()> {
    if channel.requires_address() && destination.map_or(true, |d| d.trim().is_empty()) {
        return Err(AppError::Validation {
            field: "destination_address".to_string(),
            reason: format!(
                "A destination address is required for {:?} subscriptions",
                channel
            ),
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct NotifySettingRepository {
    pool: AsyncDbPool,
}

impl NotifySettingRepository {
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

    /// Creates a subscription, enforcing the destination-address invariant.
    pub async fn create(&self, new_setting: NewNotifySetting) -> AppResult<NotifySetting> {
        validate_destination(
            new_setting.channel_type,
            new_setting.destination_address.as_deref(),
        )?;

        let mut conn = self.conn().await?;
        diesel::insert_into(notify_settings::table)
            .values(&new_setting)
            .returning(NotifySetting::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn find_by_id(&self, setting_id: i32) -> AppResult<Option<NotifySetting>> {
        let mut conn = self.conn().await?;
        notify_settings::table
            .find(setting_id)
            .select(NotifySetting::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    pub async fn find_by_user_id(&self, uid: i32) -> AppResult<Vec<NotifySetting>> {
        let mut conn = self.conn().await?;
        notify_settings::table
            .filter(notify_settings::user_id.eq(uid))
            .order(notify_settings::id.asc())
            .select(NotifySetting::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Updates a subscription. When the update touches the destination
    /// address, the invariant is re-checked against the row's channel type.
    pub async fn update(
        &self,
        setting_id: i32,
        update_data: UpdateNotifySetting,
    ) -> AppResult<NotifySetting> {
        let existing = self
            .find_by_id(setting_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "NotifySetting".to_string(),
                field: "id".to_string(),
                value: setting_id.to_string(),
            })?;

        if let Some(ref destination) = update_data.destination_address {
            validate_destination(existing.channel_type, destination.as_deref())?;
        }

        let mut conn = self.conn().await?;
        diesel::update(notify_settings::table.find(setting_id))
            .set(&update_data)
            .returning(NotifySetting::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn delete(&self, setting_id: i32) -> AppResult<usize> {
        let mut conn = self.conn().await?;
        diesel::delete(notify_settings::table.find(setting_id))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Active subscriptions that carry a usable destination address.
    pub async fn list_active_rows(&self) -> AppResult<Vec<NotifySetting>> {
        let mut conn = self.conn().await?;
        notify_settings::table
            .filter(notify_settings::is_active.eq(true))
            .filter(notify_settings::destination_address.is_not_null())
            .filter(notify_settings::destination_address.ne(""))
            .order(notify_settings::id.asc())
            .select(NotifySetting::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }
}

#[async_trait]
impl SubscriptionSource for NotifySettingRepository {
    async fn list_active(&self) -> AppResult<Vec<Subscription>> {
        let rows = self.list_active_rows().await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.destination_address.map(|destination_address| Subscription {
                    channel_type: row.channel_type,
                    destination_address,
                    keywords: row.keywords,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_destination_rejects_missing_address() {
        let result = validate_destination(ChannelType::Email, None);
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_validate_destination_rejects_blank_address() {
        let result = validate_destination(ChannelType::Webhook, Some("   "));
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_validate_destination_accepts_address() {
        assert!(validate_destination(ChannelType::Email, Some("a@x.com")).is_ok());
        assert!(validate_destination(ChannelType::Webhook, Some("https://x.com/hook")).is_ok());
    }
}
