use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "number": "204",
    "block": "B",
    "capacity": 2,
    "occupied": 1,
    "amenities": ["wifi", "attached bath"],
    "rent": 4500.0,
    "available": true
}))]
pub struct Room {
    pub id: u64,
    pub number: String,
    pub block: String,
    pub capacity: u32,
    pub occupied: u32,
    #[schema(value_type = Vec<String>)]
    pub amenities: Json<Vec<String>>,
    pub rent: f64,
    pub available: bool,
}

impl Room {
    pub fn has_vacancy(&self) -> bool {
        self.available && self.occupied < self.capacity
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    /// Pending and approved bookings hold (or may hold) a bed.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RoomBooking {
    pub id: u64,
    pub user_id: u64,
    pub room_id: u64,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    #[schema(format = "date", value_type = String)]
    pub booking_date: NaiveDate,
    #[schema(example = "2026-07-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-12-31", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewBooking {
    #[schema(example = 3)]
    pub room_id: u64,
    #[schema(example = "2026-07-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-12-31", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}
