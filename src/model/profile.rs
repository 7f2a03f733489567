use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "name": "Asha Rao",
    "roll_number": "CS21B042",
    "phone_number": "+919800000000",
    "hostel_block": "B",
    "room_number": "B-204",
    "avatar_url": null,
    "role": "student",
    "department": "Computer Science",
    "created_at": "2026-01-01T00:00:00Z",
    "updated_at": "2026-01-01T00:00:00Z"
}))]
pub struct Profile {
    pub id: u64,
    pub name: String,
    pub roll_number: String,
    pub phone_number: Option<String>,
    pub hostel_block: Option<String>,
    pub room_number: Option<String>,
    pub avatar_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub department: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// Fields a user may edit on their own profile. Role and department only
/// move through the role procedures.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ProfileUpdate {
    #[schema(example = "Asha Rao")]
    pub name: Option<String>,
    #[schema(example = "+919800000000")]
    pub phone_number: Option<String>,
    #[schema(example = "B")]
    pub hostel_block: Option<String>,
    #[schema(example = "B-204")]
    pub room_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone_number.is_none()
            && self.hostel_block.is_none()
            && self.room_number.is_none()
            && self.avatar_url.is_none()
    }

    pub fn apply(&self, profile: &mut Profile, at: DateTime<Utc>) {
        if let Some(name) = &self.name {
            profile.name = name.trim().to_string();
        }
        if let Some(phone) = &self.phone_number {
            profile.phone_number = Some(phone.clone());
        }
        if let Some(block) = &self.hostel_block {
            profile.hostel_block = Some(block.clone());
        }
        if let Some(room) = &self.room_number {
            profile.room_number = Some(room.clone());
        }
        if let Some(avatar) = &self.avatar_url {
            profile.avatar_url = Some(avatar.clone());
        }
        profile.updated_at = at;
    }
}
