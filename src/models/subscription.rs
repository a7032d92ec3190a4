//! Notification subscription models.
//!
//! A subscription is a per-user, per-channel notification preference
//! carrying a keyword set used to match incoming events.

use chrono::NaiveDateTime;
use diesel::AsExpression;
use diesel::FromSqlRow;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Channel type for subscription delivery
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Webhook,
}

impl ChannelType {
    /// Whether this channel needs a direct destination address on the
    /// subscription row. Both current channels do; a future broadcast-style
    /// channel would not.
    pub fn requires_address(&self) -> bool {
        match self {
            ChannelType::Email | ChannelType::Webhook => true,
        }
    }
}

impl diesel::query_builder::QueryId for ChannelType {
    type QueryId = ChannelType;
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl ToSql<Text, Pg> for ChannelType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let s = match self {
            ChannelType::Email => "email",
            ChannelType::Webhook => "webhook",
        };
        out.write_all(s.as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for ChannelType {
    fn from_sql(
        bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "email" => Ok(ChannelType::Email),
            "webhook" => Ok(ChannelType::Webhook),
            _ => Err(format!("Unrecognized channel_type: {}", s).into()),
        }
    }
}

/// NotifySetting query model for SELECT operations
#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = crate::schema::notify_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotifySetting {
    pub id: i32,
    pub user_id: i32,
    pub channel_type: ChannelType,
    pub destination_address: Option<String>,
    pub keywords: Vec<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// NewNotifySetting insert model for INSERT operations
#[derive(Debug, Insertable, Deserialize, Clone)]
#[diesel(table_name = crate::schema::notify_settings)]
pub struct NewNotifySetting {
    pub user_id: i32,
    pub channel_type: ChannelType,
    pub destination_address: Option<String>,
    pub keywords: Vec<String>,
    pub is_active: bool,
}

/// UpdateNotifySetting model for UPDATE operations
#[derive(Debug, AsChangeset, Deserialize, Clone, Default)]
#[diesel(table_name = crate::schema::notify_settings)]
pub struct UpdateNotifySetting {
    pub destination_address: Option<Option<String>>,
    pub keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ChannelType::Email).unwrap(), "\"email\"");
        assert_eq!(
            serde_json::from_str::<ChannelType>("\"webhook\"").unwrap(),
            ChannelType::Webhook
        );
    }

    #[test]
    fn test_channel_types_require_address() {
        assert!(ChannelType::Email.requires_address());
        assert!(ChannelType::Webhook.requires_address());
    }
}
