use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComplaintCategory {
    Maintenance,
    Mess,
    Security,
    Other,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
}

/// Shared by complaints and notices.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

macro_rules! parse_from_string {
    ($($t:ty),*) => {
        $(impl TryFrom<String> for $t {
            type Error = strum::ParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        })*
    };
}

parse_from_string!(ComplaintCategory, ComplaintStatus, Priority);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Complaint {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: ComplaintCategory,
    #[sqlx(try_from = "String")]
    pub status: ComplaintStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewComplaint {
    #[schema(example = "Leaking tap")]
    pub title: String,
    #[schema(example = "The tap in B-204 has been leaking since Monday.")]
    pub description: String,
    #[schema(example = "maintenance")]
    pub category: ComplaintCategory,
    #[serde(default)]
    pub priority: Priority,
}
