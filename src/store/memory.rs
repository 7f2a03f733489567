use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;

use super::{
    AccountStore, AttendanceStore, ComplaintStore, MessMenuStore, NoticeStore, ProfileStore,
    RoomStore, StoreError, StoreResult,
};
use crate::model::{
    attendance::{AttendanceFilter, AttendanceMark, AttendanceRecord, AttendanceSettings},
    complaint::{Complaint, ComplaintStatus, NewComplaint},
    mess_menu::{MealType, MessMenu},
    notice::{NewNotice, Notice},
    profile::{Profile, ProfileUpdate},
    role::Role,
    room::{BookingStatus, NewBooking, Room, RoomBooking},
    user::{Account, NewAccount},
};

#[derive(Default)]
struct Tables {
    next_id: u64,
    accounts: Vec<Account>,
    refresh_tokens: HashMap<String, (u64, DateTime<Utc>, bool)>,
    profiles: Vec<Profile>,
    attendance: HashMap<(u64, NaiveDate), AttendanceRecord>,
    settings: Option<AttendanceSettings>,
    rooms: Vec<Room>,
    bookings: Vec<RoomBooking>,
    complaints: Vec<Complaint>,
    menus: Vec<MessMenu>,
    notices: Vec<Notice>,
    #[cfg(test)]
    failing_users: HashSet<u64>,
}

impl Tables {
    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    #[cfg(test)]
    fn check_writable(&self, user_id: u64) -> StoreResult<()> {
        if self.failing_users.contains(&user_id) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "write rejected for user {user_id}"
            ))));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_writable(&self, _user_id: u64) -> StoreResult<()> {
        Ok(())
    }
}

/// In-process store used by the tests and when no `DATABASE_URL` is
/// configured. One mutex guards every table, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with a handful of rooms and a weekly menu for local runs.
    pub fn seeded() -> Self {
        let store = Self::new();
        for (block, number, capacity, rent) in [
            ("A", "101", 2, 4000.0),
            ("A", "102", 3, 3500.0),
            ("B", "201", 1, 6000.0),
        ] {
            store.add_room(block, number, capacity, rent);
        }
        for day in [
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
        ] {
            store.add_menu(day, MealType::Breakfast, &["poha", "tea"], "07:30 - 09:30");
            store.add_menu(day, MealType::Lunch, &["rice", "dal", "sabzi"], "12:30 - 14:00");
            store.add_menu(day, MealType::Dinner, &["roti", "paneer", "kheer"], "19:30 - 21:30");
        }
        store
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_room(&self, block: &str, number: &str, capacity: u32, rent: f64) -> Room {
        let mut t = self.tables();
        let room = Room {
            id: t.id(),
            number: number.to_string(),
            block: block.to_string(),
            capacity,
            occupied: 0,
            amenities: Json(vec!["wifi".to_string()]),
            rent,
            available: true,
        };
        t.rooms.push(room.clone());
        room
    }

    pub fn add_menu(&self, day: &str, meal_type: MealType, items: &[&str], meal_time: &str) {
        let mut t = self.tables();
        let menu = MessMenu {
            id: t.id(),
            day_of_week: day.to_string(),
            meal_type,
            items: Json(items.iter().map(|s| s.to_string()).collect()),
            meal_time: meal_time.to_string(),
        };
        t.menus.push(menu);
    }

    /// Makes every attendance write for `user_id` fail.
    #[cfg(test)]
    pub fn fail_attendance_writes_for(&self, user_id: u64) {
        self.tables().failing_users.insert(user_id);
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let t = self.tables();
        Ok(t.accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> StoreResult<u64> {
        let mut t = self.tables();
        if t.accounts
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        let id = t.id();
        t.accounts.push(Account {
            id,
            email: account.email.to_lowercase(),
            password: account.password_hash,
            name: account.name,
            roll_number: account.roll_number,
            phone_number: account.phone_number,
            last_sign_in_at: None,
        });
        Ok(id)
    }

    async fn touch_sign_in(&self, id: u64, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.tables();
        let account = t
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        account.last_sign_in_at = Some(at);
        Ok(())
    }

    async fn list_emails(&self) -> StoreResult<Vec<String>> {
        Ok(self.tables().accounts.iter().map(|a| a.email.clone()).collect())
    }

    async fn recent_emails(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
        Ok(self
            .tables()
            .accounts
            .iter()
            .filter(|a| a.last_sign_in_at.is_some_and(|at| at >= since))
            .map(|a| a.email.clone())
            .collect())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.tables()
            .refresh_tokens
            .insert(jti.to_string(), (user_id, expires_at, false));
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        let mut t = self.tables();
        match t.refresh_tokens.get_mut(jti) {
            Some((_, _, revoked)) if !*revoked => {
                *revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, id: u64) -> StoreResult<Option<Profile>> {
        Ok(self.tables().profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_profile(&self, profile: Profile) -> StoreResult<Profile> {
        let mut t = self.tables();
        if t.profiles.iter().any(|p| p.id == profile.id) {
            return Err(StoreError::Conflict("profile already exists".into()));
        }
        t.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        let mut profiles = self.tables().profiles.clone();
        newest_first(&mut profiles, |p| (p.created_at, p.id));
        Ok(profiles)
    }

    async fn list_profiles_by_role(&self, role: Role) -> StoreResult<Vec<Profile>> {
        let mut profiles: Vec<_> = self
            .tables()
            .profiles
            .iter()
            .filter(|p| p.role == role)
            .cloned()
            .collect();
        newest_first(&mut profiles, |p| (p.created_at, p.id));
        Ok(profiles)
    }

    async fn update_profile(
        &self,
        id: u64,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> StoreResult<Profile> {
        let mut t = self.tables();
        let profile = t
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        update.apply(profile, at);
        Ok(profile.clone())
    }

    async fn set_role(
        &self,
        id: u64,
        role: Role,
        department: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Profile> {
        let mut t = self.tables();
        let profile = t
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        profile.role = role;
        if department.is_some() {
            profile.department = department;
        }
        profile.updated_at = at;
        Ok(profile.clone())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.tables().attendance.get(&(user_id, date)).cloned())
    }

    async fn upsert_record(&self, mark: AttendanceMark) -> StoreResult<AttendanceRecord> {
        let mut t = self.tables();
        t.check_writable(mark.user_id)?;

        let key = (mark.user_id, mark.date);
        let existing = t.attendance.get(&key).cloned();
        let record = match existing {
            Some(existing) => AttendanceRecord {
                status: mark.status,
                check_in_time: mark.check_in_time,
                check_out_time: mark.check_out_time,
                notes: mark.notes,
                marked_by: Some(mark.marked_by),
                updated_at: mark.at,
                ..existing
            },
            None => AttendanceRecord {
                id: t.id(),
                user_id: mark.user_id,
                date: mark.date,
                status: mark.status,
                check_in_time: mark.check_in_time,
                check_out_time: mark.check_out_time,
                notes: mark.notes,
                marked_by: Some(mark.marked_by),
                created_at: mark.at,
                updated_at: mark.at,
            },
        };
        t.attendance.insert(key, record.clone());
        Ok(record)
    }

    async fn list_records(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .tables()
            .attendance
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut records, |r| (r.date, r.id));
        Ok(records)
    }

    async fn get_settings(&self) -> StoreResult<Option<AttendanceSettings>> {
        Ok(self.tables().settings.clone())
    }

    async fn save_settings(&self, settings: &AttendanceSettings) -> StoreResult<AttendanceSettings> {
        self.tables().settings = Some(settings.clone());
        Ok(settings.clone())
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        let mut rooms = self.tables().rooms.clone();
        rooms.sort_by(|a, b| (&a.block, &a.number).cmp(&(&b.block, &b.number)));
        Ok(rooms)
    }

    async fn get_room(&self, id: u64) -> StoreResult<Option<Room>> {
        Ok(self.tables().rooms.iter().find(|r| r.id == id).cloned())
    }

    async fn list_bookings(&self, user_id: Option<u64>) -> StoreResult<Vec<RoomBooking>> {
        let mut bookings: Vec<_> = self
            .tables()
            .bookings
            .iter()
            .filter(|b| user_id.is_none_or(|u| b.user_id == u))
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| (b.created_at, b.id));
        Ok(bookings)
    }

    async fn get_booking(&self, id: u64) -> StoreResult<Option<RoomBooking>> {
        Ok(self.tables().bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn insert_booking(
        &self,
        user_id: u64,
        booking: &NewBooking,
        at: DateTime<Utc>,
    ) -> StoreResult<RoomBooking> {
        let mut t = self.tables();
        let row = RoomBooking {
            id: t.id(),
            user_id,
            room_id: booking.room_id,
            status: BookingStatus::Pending,
            booking_date: at.date_naive(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            created_at: at,
        };
        t.bookings.push(row.clone());
        Ok(row)
    }

    async fn set_booking_status(
        &self,
        id: u64,
        from: BookingStatus,
        to: BookingStatus,
        occupancy_delta: i32,
    ) -> StoreResult<RoomBooking> {
        let mut t = self.tables();
        let Tables { bookings, rooms, .. } = &mut *t;

        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound)?;
        if booking.status != from {
            return Err(StoreError::Conflict(format!(
                "booking {id} is {}, not {from}",
                booking.status
            )));
        }

        if occupancy_delta != 0 {
            let room = rooms
                .iter_mut()
                .find(|r| r.id == booking.room_id)
                .ok_or(StoreError::NotFound)?;
            let occupied = room.occupied.saturating_add_signed(occupancy_delta);
            if occupancy_delta > 0 && occupied > room.capacity {
                return Err(StoreError::Conflict(format!("room {} is full", room.id)));
            }
            room.occupied = occupied;
        }

        booking.status = to;
        Ok(booking.clone())
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn list_complaints(&self, user_id: Option<u64>) -> StoreResult<Vec<Complaint>> {
        let mut complaints: Vec<_> = self
            .tables()
            .complaints
            .iter()
            .filter(|c| user_id.is_none_or(|u| c.user_id == u))
            .cloned()
            .collect();
        newest_first(&mut complaints, |c| (c.created_at, c.id));
        Ok(complaints)
    }

    async fn insert_complaint(
        &self,
        user_id: u64,
        complaint: &NewComplaint,
        at: DateTime<Utc>,
    ) -> StoreResult<Complaint> {
        let mut t = self.tables();
        let row = Complaint {
            id: t.id(),
            user_id,
            title: complaint.title.clone(),
            description: complaint.description.clone(),
            category: complaint.category,
            status: ComplaintStatus::Pending,
            priority: complaint.priority,
            resolved_at: None,
            created_at: at,
            updated_at: at,
        };
        t.complaints.push(row.clone());
        Ok(row)
    }

    async fn set_complaint_status(
        &self,
        id: u64,
        status: ComplaintStatus,
        resolved_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<Complaint> {
        let mut t = self.tables();
        let complaint = t
            .complaints
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound)?;
        complaint.status = status;
        complaint.resolved_at = resolved_at;
        complaint.updated_at = at;
        Ok(complaint.clone())
    }
}

#[async_trait]
impl MessMenuStore for MemoryStore {
    async fn list_menus(&self) -> StoreResult<Vec<MessMenu>> {
        let mut menus = self.tables().menus.clone();
        menus.sort_by_key(|m| (m.day_order(), m.meal_type));
        Ok(menus)
    }
}

#[async_trait]
impl NoticeStore for MemoryStore {
    async fn list_active_notices(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<Notice>> {
        let mut notices: Vec<_> = self
            .tables()
            .notices
            .iter()
            .filter(|n| n.is_active(now))
            .cloned()
            .collect();
        newest_first(&mut notices, |n| (n.priority, n.created_at, n.id));
        notices.truncate(limit as usize);
        Ok(notices)
    }

    async fn insert_notice(&self, notice: &NewNotice, at: DateTime<Utc>) -> StoreResult<Notice> {
        let mut t = self.tables();
        let row = Notice {
            id: t.id(),
            title: notice.title.clone(),
            content: notice.content.clone(),
            priority: notice.priority,
            expires_at: notice.expires_at,
            created_at: at,
        };
        t.notices.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    fn mark(user_id: u64, status: AttendanceStatus) -> AttendanceMark {
        AttendanceMark {
            user_id,
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            status,
            check_in_time: None,
            check_out_time: None,
            notes: None,
            marked_by: 99,
            at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn upsert_keeps_one_record_per_user_and_day() {
        let store = MemoryStore::new();
        let first = store.upsert_record(mark(5, AttendanceStatus::Absent)).await.unwrap();
        let second = store.upsert_record(mark(5, AttendanceStatus::Excused)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, AttendanceStatus::Excused);
        let all = store.list_records(&AttendanceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let account = || NewAccount {
            email: "a@hostel.test".into(),
            password_hash: "x".into(),
            name: "A".into(),
            roll_number: "R1".into(),
            phone_number: None,
        };
        store.insert_account(account()).await.unwrap();
        let err = store.insert_account(account()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[actix_web::test]
    async fn refresh_tokens_revoke_once() {
        let store = MemoryStore::new();
        store.store_refresh_token(1, "jti-1", Utc::now()).await.unwrap();
        assert!(store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("unknown").await.unwrap());
    }
}
