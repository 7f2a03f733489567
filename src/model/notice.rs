use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::complaint::Priority;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Notice {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub expires_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewNotice {
    #[schema(example = "Water supply interruption")]
    pub title: String,
    #[schema(example = "No water in block B between 10:00 and 12:00 on Saturday.")]
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub expires_at: Option<DateTime<Utc>>,
}
