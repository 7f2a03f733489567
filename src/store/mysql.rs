use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::TryStreamExt;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::{
    AccountStore, AttendanceStore, ComplaintStore, MessMenuStore, NoticeStore, ProfileStore,
    RoomStore, StoreError, StoreResult,
};
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

const PROFILE_COLUMNS: &str = r#"
    id, name, roll_number, phone_number, hostel_block, room_number,
    avatar_url, role, department, created_at, updated_at
"#;

const ATTENDANCE_COLUMNS: &str = r#"
    id, user_id, date, status, check_in_time, check_out_time,
    notes, marked_by, created_at, updated_at
"#;

const BOOKING_COLUMNS: &str = r#"
    id, user_id, room_id, status, booking_date, start_date, end_date, created_at
"#;

const COMPLAINT_COLUMNS: &str = r#"
    id, user_id, title, description, category, status, priority,
    resolved_at, created_at, updated_at
"#;

/// MySQL-backed store. Queries are checked at runtime so the crate builds
/// without a live database.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_profile(&self, id: u64) -> StoreResult<Profile> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?");
        Ok(sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn fetch_booking(&self, id: u64) -> StoreResult<RoomBooking> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM room_bookings WHERE id = ?");
        Ok(sqlx::query_as::<_, RoomBooking>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn fetch_complaint(&self, id: u64) -> StoreResult<Complaint> {
        let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?");
        Ok(sqlx::query_as::<_, Complaint>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl AccountStore for MySqlStore {
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password, name, roll_number, phone_number, last_sign_in_at
            FROM accounts
            WHERE email = LOWER(?)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_account(&self, account: NewAccount) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (email, password, name, roll_number, phone_number)
            VALUES (LOWER(?), ?, ?, ?, ?)
            "#,
        )
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.name)
        .bind(&account.roll_number)
        .bind(&account.phone_number)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn touch_sign_in(&self, id: u64, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE accounts SET last_sign_in_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_emails(&self) -> StoreResult<Vec<String>> {
        let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM accounts").fetch(&self.pool);
        let mut emails = Vec::new();
        while let Some((email,)) = stream.try_next().await? {
            emails.push(email);
        }
        Ok(emails)
    }

    async fn recent_emails(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT email
            FROM accounts
            WHERE last_sign_in_at >= ?
            ORDER BY last_sign_in_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ?
            AND revoked = FALSE
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileStore for MySqlStore {
    async fn get_profile(&self, id: u64) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?");
        Ok(sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_profile(&self, profile: Profile) -> StoreResult<Profile> {
        sqlx::query(
            r#"
            INSERT INTO profiles
                (id, name, roll_number, phone_number, hostel_block, room_number,
                 avatar_url, role, department, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.name)
        .bind(&profile.roll_number)
        .bind(&profile.phone_number)
        .bind(&profile.hostel_block)
        .bind(&profile.room_number)
        .bind(&profile.avatar_url)
        .bind(profile.role.as_ref())
        .bind(&profile.department)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_profiles_by_role(&self, role: Role) -> StoreResult<Vec<Profile>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE role = ? ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Profile>(&sql)
            .bind(role.as_ref())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_profile(
        &self,
        id: u64,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> StoreResult<Profile> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET name = COALESCE(?, name),
                phone_number = COALESCE(?, phone_number),
                hostel_block = COALESCE(?, hostel_block),
                room_number = COALESCE(?, room_number),
                avatar_url = COALESCE(?, avatar_url),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.phone_number)
        .bind(&update.hostel_block)
        .bind(&update.room_number)
        .bind(&update.avatar_url)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.fetch_profile(id).await
    }

    async fn set_role(
        &self,
        id: u64,
        role: Role,
        department: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Profile> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET role = ?,
                department = COALESCE(?, department),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(role.as_ref())
        .bind(department)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.fetch_profile(id).await
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE user_id = ? AND date = ?"
        );
        Ok(sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_record(&self, mark: AttendanceMark) -> StoreResult<AttendanceRecord> {
        // (user_id, date) carries a UNIQUE key; the last writer wins.
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (user_id, date, status, check_in_time, check_out_time,
                 notes, marked_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                check_in_time = VALUES(check_in_time),
                check_out_time = VALUES(check_out_time),
                notes = VALUES(notes),
                marked_by = VALUES(marked_by),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(mark.user_id)
        .bind(mark.date)
        .bind(mark.status.as_ref())
        .bind(mark.check_in_time)
        .bind(mark.check_out_time)
        .bind(&mark.notes)
        .bind(mark.marked_by)
        .bind(mark.at)
        .bind(mark.at)
        .execute(&self.pool)
        .await?;

        self.find_record(mark.user_id, mark.date)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list_records(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE 1=1"
        ));

        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND date <= ").push_bind(end);
        }
        qb.push(" ORDER BY date DESC, id DESC");

        Ok(qb
            .build_query_as::<AttendanceRecord>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_settings(&self) -> StoreResult<Option<AttendanceSettings>> {
        Ok(sqlx::query_as::<_, AttendanceSettings>(
            r#"
            SELECT id, check_in_start, check_in_end, check_out_start, check_out_end,
                   late_threshold_minutes, auto_mark_absent_after, updated_at
            FROM attendance_settings
            ORDER BY id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn save_settings(&self, settings: &AttendanceSettings) -> StoreResult<AttendanceSettings> {
        sqlx::query(
            r#"
            INSERT INTO attendance_settings
                (id, check_in_start, check_in_end, check_out_start, check_out_end,
                 late_threshold_minutes, auto_mark_absent_after, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                check_in_start = VALUES(check_in_start),
                check_in_end = VALUES(check_in_end),
                check_out_start = VALUES(check_out_start),
                check_out_end = VALUES(check_out_end),
                late_threshold_minutes = VALUES(late_threshold_minutes),
                auto_mark_absent_after = VALUES(auto_mark_absent_after),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(settings.id)
        .bind(settings.check_in_start)
        .bind(settings.check_in_end)
        .bind(settings.check_out_start)
        .bind(settings.check_out_end)
        .bind(settings.late_threshold_minutes)
        .bind(settings.auto_mark_absent_after)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(settings.clone())
    }
}

#[async_trait]
impl RoomStore for MySqlStore {
    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        Ok(sqlx::query_as::<_, Room>(
            r#"
            SELECT id, number, block, capacity, occupied, amenities, rent, available
            FROM rooms
            ORDER BY block ASC, number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_room(&self, id: u64) -> StoreResult<Option<Room>> {
        Ok(sqlx::query_as::<_, Room>(
            r#"
            SELECT id, number, block, capacity, occupied, amenities, rent, available
            FROM rooms
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_bookings(&self, user_id: Option<u64>) -> StoreResult<Vec<RoomBooking>> {
        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM room_bookings"));
        if let Some(user_id) = user_id {
            qb.push(" WHERE user_id = ").push_bind(user_id);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        Ok(qb
            .build_query_as::<RoomBooking>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_booking(&self, id: u64) -> StoreResult<Option<RoomBooking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM room_bookings WHERE id = ?");
        Ok(sqlx::query_as::<_, RoomBooking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_booking(
        &self,
        user_id: u64,
        booking: &NewBooking,
        at: DateTime<Utc>,
    ) -> StoreResult<RoomBooking> {
        let result = sqlx::query(
            r#"
            INSERT INTO room_bookings
                (user_id, room_id, status, booking_date, start_date, end_date, created_at)
            VALUES (?, ?, 'pending', ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(booking.room_id)
        .bind(at.date_naive())
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(at)
        .execute(&self.pool)
        .await?;

        self.fetch_booking(result.last_insert_id()).await
    }

    async fn set_booking_status(
        &self,
        id: u64,
        from: BookingStatus,
        to: BookingStatus,
        occupancy_delta: i32,
    ) -> StoreResult<RoomBooking> {
        // Dropping `tx` on an early return rolls both updates back.
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE room_bookings SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_ref())
            .bind(id)
            .bind(from.as_ref())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("booking {id} is no longer {from}")));
        }

        if occupancy_delta > 0 {
            let result = sqlx::query(
                r#"
                UPDATE rooms
                SET occupied = occupied + ?
                WHERE id = (SELECT room_id FROM room_bookings WHERE id = ?)
                AND occupied + ? <= capacity
                "#,
            )
            .bind(occupancy_delta)
            .bind(id)
            .bind(occupancy_delta)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Conflict(format!("room for booking {id} is full")));
            }
        } else if occupancy_delta < 0 {
            sqlx::query(
                r#"
                UPDATE rooms
                SET occupied = GREATEST(CAST(occupied AS SIGNED) + ?, 0)
                WHERE id = (SELECT room_id FROM room_bookings WHERE id = ?)
                "#,
            )
            .bind(occupancy_delta)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.fetch_booking(id).await
    }
}

#[async_trait]
impl ComplaintStore for MySqlStore {
    async fn list_complaints(&self, user_id: Option<u64>) -> StoreResult<Vec<Complaint>> {
        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new(format!("SELECT {COMPLAINT_COLUMNS} FROM complaints"));
        if let Some(user_id) = user_id {
            qb.push(" WHERE user_id = ").push_bind(user_id);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        Ok(qb
            .build_query_as::<Complaint>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_complaint(
        &self,
        user_id: u64,
        complaint: &NewComplaint,
        at: DateTime<Utc>,
    ) -> StoreResult<Complaint> {
        let result = sqlx::query(
            r#"
            INSERT INTO complaints
                (user_id, title, description, category, status, priority, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&complaint.title)
        .bind(&complaint.description)
        .bind(complaint.category.as_ref())
        .bind(complaint.priority.as_ref())
        .bind(at)
        .bind(at)
        .execute(&self.pool)
        .await?;

        self.fetch_complaint(result.last_insert_id()).await
    }

    async fn set_complaint_status(
        &self,
        id: u64,
        status: ComplaintStatus,
        resolved_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<Complaint> {
        let result = sqlx::query(
            r#"
            UPDATE complaints
            SET status = ?, resolved_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(resolved_at)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.fetch_complaint(id).await
    }
}

#[async_trait]
impl MessMenuStore for MySqlStore {
    async fn list_menus(&self) -> StoreResult<Vec<MessMenu>> {
        Ok(sqlx::query_as::<_, MessMenu>(
            r#"
            SELECT id, day_of_week, meal_type, items, meal_time
            FROM mess_menus
            ORDER BY FIELD(day_of_week, 'monday', 'tuesday', 'wednesday', 'thursday',
                           'friday', 'saturday', 'sunday'),
                     FIELD(meal_type, 'breakfast', 'lunch', 'dinner')
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl NoticeStore for MySqlStore {
    async fn list_active_notices(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<Notice>> {
        Ok(sqlx::query_as::<_, Notice>(
            r#"
            SELECT id, title, content, priority, expires_at, created_at
            FROM notices
            WHERE expires_at IS NULL OR expires_at > ?
            ORDER BY FIELD(priority, 'high', 'medium', 'low'), created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_notice(&self, notice: &NewNotice, at: DateTime<Utc>) -> StoreResult<Notice> {
        let result = sqlx::query(
            r#"
            INSERT INTO notices (title, content, priority, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(notice.priority.as_ref())
        .bind(notice.expires_at)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(Notice {
            id: result.last_insert_id(),
            title: notice.title.clone(),
            content: notice.content.clone(),
            priority: notice.priority,
            expires_at: notice.expires_at,
            created_at: at,
        })
    }
}
