//! Data access. Every table and procedure the service needs sits behind one
//! of the traits below so the workflows can run against MySQL in
//! production and against [`memory::MemoryStore`] in tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    attendance::{AttendanceFilter, AttendanceMark, AttendanceRecord, AttendanceSettings},
    complaint::{Complaint, ComplaintStatus, NewComplaint},
    mess_menu::MessMenu,
    notice::{NewNotice, Notice},
    profile::{Profile, ProfileUpdate},
    role::Role,
    room::{BookingStatus, NewBooking, Room, RoomBooking},
    user::{Account, NewAccount},
};

pub mod memory;
pub mod mysql;

#[derive(Debug, derive_more::Display)]
pub enum StoreError {
    #[display(fmt = "record not found")]
    NotFound,
    #[display(fmt = "conflict: {}", _0)]
    Conflict(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::RowNotFound) {
            return StoreError::NotFound;
        }

        // MySQL reports unique-key violations as SQLSTATE 23000
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }

        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn insert_account(&self, account: NewAccount) -> StoreResult<u64>;
    async fn touch_sign_in(&self, id: u64, at: DateTime<Utc>) -> StoreResult<()>;
    async fn list_emails(&self) -> StoreResult<Vec<String>>;
    async fn recent_emails(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    /// Returns true if the token existed and was still live.
    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: u64) -> StoreResult<Option<Profile>>;
    async fn insert_profile(&self, profile: Profile) -> StoreResult<Profile>;
    /// Newest first.
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;
    async fn list_profiles_by_role(&self, role: Role) -> StoreResult<Vec<Profile>>;
    async fn update_profile(
        &self,
        id: u64,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> StoreResult<Profile>;
    /// Sets the role in one statement. `department: None` leaves the
    /// department untouched.
    async fn set_role(
        &self,
        id: u64,
        role: Role,
        department: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Profile>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_record(&self, user_id: u64, date: NaiveDate)
    -> StoreResult<Option<AttendanceRecord>>;
    /// Inserts or replaces the single record for (user, date).
    async fn upsert_record(&self, mark: AttendanceMark) -> StoreResult<AttendanceRecord>;
    /// Ordered by date, newest first.
    async fn list_records(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>>;
    async fn get_settings(&self) -> StoreResult<Option<AttendanceSettings>>;
    async fn save_settings(&self, settings: &AttendanceSettings) -> StoreResult<AttendanceSettings>;
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Ordered by block, then number.
    async fn list_rooms(&self) -> StoreResult<Vec<Room>>;
    async fn get_room(&self, id: u64) -> StoreResult<Option<Room>>;
    /// All bookings when `user_id` is `None`. Newest first.
    async fn list_bookings(&self, user_id: Option<u64>) -> StoreResult<Vec<RoomBooking>>;
    async fn get_booking(&self, id: u64) -> StoreResult<Option<RoomBooking>>;
    async fn insert_booking(
        &self,
        user_id: u64,
        booking: &NewBooking,
        at: DateTime<Utc>,
    ) -> StoreResult<RoomBooking>;
    /// Moves a booking from `from` to `to` and shifts the room's occupancy
    /// by `occupancy_delta` in the same transaction. Fails with
    /// [`StoreError::Conflict`] when the booking is no longer in `from`, or
    /// when a positive delta would take the room past its capacity.
    async fn set_booking_status(
        &self,
        id: u64,
        from: BookingStatus,
        to: BookingStatus,
        occupancy_delta: i32,
    ) -> StoreResult<RoomBooking>;
}

#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// All complaints when `user_id` is `None`. Newest first.
    async fn list_complaints(&self, user_id: Option<u64>) -> StoreResult<Vec<Complaint>>;
    async fn insert_complaint(
        &self,
        user_id: u64,
        complaint: &NewComplaint,
        at: DateTime<Utc>,
    ) -> StoreResult<Complaint>;
    async fn set_complaint_status(
        &self,
        id: u64,
        status: ComplaintStatus,
        resolved_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<Complaint>;
}

#[async_trait]
pub trait MessMenuStore: Send + Sync {
    async fn list_menus(&self) -> StoreResult<Vec<MessMenu>>;
}

#[async_trait]
pub trait NoticeStore: Send + Sync {
    /// Unexpired notices, highest priority first, then newest.
    async fn list_active_notices(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<Notice>>;
    async fn insert_notice(&self, notice: &NewNotice, at: DateTime<Utc>) -> StoreResult<Notice>;
}

/// Everything the service needs from its backing store.
pub trait HostelStore:
    AccountStore + ProfileStore + AttendanceStore + RoomStore + ComplaintStore + MessMenuStore + NoticeStore
{
}

impl<T> HostelStore for T where
    T: AccountStore
        + ProfileStore
        + AttendanceStore
        + RoomStore
        + ComplaintStore
        + MessMenuStore
        + NoticeStore
{
}
