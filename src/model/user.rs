use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity-provider account. Profile data lives in [`super::profile::Profile`];
/// the sign-up metadata kept here seeds that profile on first sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub password: String,
    pub name: String,
    pub roll_number: String,
    pub phone_number: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub roll_number: String,
    pub phone_number: Option<String>,
}
