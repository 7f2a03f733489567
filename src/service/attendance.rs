//! Daily attendance: student check-in/check-out, staff marking and
//! windowed statistics.
//!
//! Per (user, date) the record moves `none -> present (checked in) ->
//! present (checked out)`. Staff marks can put a record into any status;
//! absent, late and excused marks without a check-in close the day for
//! self-service.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use derive_more::Display;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::model::{
    attendance::{
        AttendanceFilter, AttendanceMark, AttendanceRecord, AttendanceSettings, AttendanceStats,
        AttendanceStatus, Grade, SettingsPatch,
    },
    role::{Actor, Capability, Role},
};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::store::{HostelStore, StoreError};

#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "Already checked in on {}", _0)]
    DuplicateCheckIn(NaiveDate),
    #[display(fmt = "No check-in found for {}", _0)]
    NoCheckIn(NaiveDate),
    #[display(fmt = "Already checked out on {}", _0)]
    AlreadyCheckedOut(NaiveDate),
    #[display(fmt = "Attendance for {} was already marked {} by staff", date, status)]
    StaffMarked {
        date: NaiveDate,
        status: AttendanceStatus,
    },
    #[display(fmt = "Role {} is not allowed to {}", role, capability)]
    Forbidden { role: Role, capability: Capability },
    #[display(fmt = "Start date {} is after end date {}", start, end)]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[display(fmt = "Invalid attendance settings: {}", _0)]
    InvalidSettings(&'static str),
    #[display(fmt = "Absentees can only be swept after {}", _0)]
    TooEarly(NaiveTime),
    #[display(fmt = "No users selected")]
    EmptySelection,
    #[display(fmt = "User {} not found", _0)]
    UserNotFound(u64),
    #[display(fmt = "User {} is a {}, not a student", user_id, role)]
    NotAStudent { user_id: u64, role: Role },
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for AttendanceError {}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        AttendanceError::Store(e)
    }
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;

fn require(actor: &Actor, capability: Capability) -> AttendanceResult<()> {
    if actor.can(capability) {
        Ok(())
    } else {
        Err(AttendanceError::Forbidden {
            role: actor.role,
            capability,
        })
    }
}

/// Outcome of one user's mark within a bulk request.
#[derive(Debug)]
pub struct MarkOutcome {
    pub user_id: u64,
    pub result: AttendanceResult<AttendanceRecord>,
}

/// Per-user results of a bulk mark. Successful marks stay committed even
/// when others fail.
#[derive(Debug)]
pub struct BulkMarkReport {
    pub outcomes: Vec<MarkOutcome>,
}

impl BulkMarkReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsQuery {
    pub user_id: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatsReport {
    pub user_id: Option<u64>,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// `None` when the window holds no records.
    pub stats: Option<AttendanceStats>,
    pub grade: Option<Grade>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SweepReport {
    #[schema(format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    pub marked_absent: Vec<u64>,
    pub failed: Vec<u64>,
}

pub struct AttendanceWorkflow {
    store: Arc<dyn HostelStore>,
    notifier: Arc<Notifier>,
    default_window_days: i64,
}

impl AttendanceWorkflow {
    pub fn new(store: Arc<dyn HostelStore>, notifier: Arc<Notifier>, default_window_days: i64) -> Self {
        Self {
            store,
            notifier,
            default_window_days,
        }
    }

    /// Student self check-in for `now`'s date.
    #[instrument(name = "attendance_check_in", skip(self), fields(user_id = actor.user_id))]
    pub async fn check_in(&self, actor: Actor, now: DateTime<Utc>) -> AttendanceResult<AttendanceRecord> {
        require(&actor, Capability::CheckInOut)?;
        let today = now.date_naive();

        let existing = self.store.find_record(actor.user_id, today).await?;
        if let Some(record) = &existing {
            if record.check_in_time.is_some() {
                return Err(AttendanceError::DuplicateCheckIn(today));
            }
            if record.status.locks_self_service() {
                warn!(status = %record.status, "Check-in refused over staff mark");
                return Err(AttendanceError::StaffMarked {
                    date: today,
                    status: record.status,
                });
            }
        }

        let record = self
            .store
            .upsert_record(AttendanceMark {
                user_id: actor.user_id,
                date: today,
                status: AttendanceStatus::Present,
                check_in_time: Some(now),
                check_out_time: None,
                notes: existing.and_then(|r| r.notes),
                marked_by: actor.user_id,
                at: now,
            })
            .await?;

        info!("Checked in");
        Ok(record)
    }

    #[instrument(name = "attendance_check_out", skip(self), fields(user_id = actor.user_id))]
    pub async fn check_out(&self, actor: Actor, now: DateTime<Utc>) -> AttendanceResult<AttendanceRecord> {
        require(&actor, Capability::CheckInOut)?;
        let today = now.date_naive();

        let record = match self.store.find_record(actor.user_id, today).await? {
            Some(r) if r.check_in_time.is_some() => r,
            _ => return Err(AttendanceError::NoCheckIn(today)),
        };
        if record.check_out_time.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut(today));
        }

        let record = self
            .store
            .upsert_record(AttendanceMark {
                user_id: record.user_id,
                date: record.date,
                status: record.status,
                check_in_time: record.check_in_time,
                check_out_time: Some(now),
                notes: record.notes,
                marked_by: record.marked_by.unwrap_or(actor.user_id),
                at: now,
            })
            .await?;

        info!("Checked out");
        Ok(record)
    }

    /// Staff assignment of `status` for one student on `date`. When `date`
    /// is today, arrival statuses stamp `now` as the check-in if the day has
    /// none yet.
    pub async fn mark(
        &self,
        actor: Actor,
        user_id: u64,
        status: AttendanceStatus,
        date: NaiveDate,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> AttendanceResult<AttendanceRecord> {
        require(&actor, Capability::MarkAttendance)?;

        let profile = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or(AttendanceError::UserNotFound(user_id))?;
        if profile.role != Role::Student {
            return Err(AttendanceError::NotAStudent {
                user_id,
                role: profile.role,
            });
        }

        let existing = self.store.find_record(user_id, date).await?;
        let (check_in_time, check_out_time) = match &existing {
            Some(r) => (r.check_in_time, r.check_out_time),
            None => (None, None),
        };
        let check_in_time = match check_in_time {
            None if status.records_arrival() && date == now.date_naive() => Some(now),
            other => other,
        };

        let record = self
            .store
            .upsert_record(AttendanceMark {
                user_id,
                date,
                status,
                check_in_time,
                check_out_time,
                notes,
                marked_by: actor.user_id,
                at: now,
            })
            .await?;

        debug!(user_id, %date, %status, marker = actor.user_id, "Attendance marked");
        Ok(record)
    }

    /// Marks every user in `user_ids` concurrently and reports each result.
    /// Nothing is rolled back when some marks fail.
    #[instrument(
        name = "attendance_bulk_mark",
        skip(self, user_ids, notes),
        fields(marker = actor.user_id, count = user_ids.len())
    )]
    pub async fn bulk_mark(
        &self,
        actor: Actor,
        user_ids: &[u64],
        status: AttendanceStatus,
        date: NaiveDate,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> AttendanceResult<BulkMarkReport> {
        require(&actor, Capability::MarkAttendance)?;

        let mut seen = HashSet::new();
        let targets: Vec<u64> = user_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if targets.is_empty() {
            return Err(AttendanceError::EmptySelection);
        }

        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let results = join_all(
            targets
                .iter()
                .map(|&user_id| self.mark(actor, user_id, status, date, notes.clone(), now)),
        )
        .await;

        let outcomes: Vec<MarkOutcome> = targets
            .into_iter()
            .zip(results)
            .map(|(user_id, result)| MarkOutcome { user_id, result })
            .collect();
        let report = BulkMarkReport { outcomes };

        for outcome in report.outcomes.iter().filter(|o| o.result.is_ok()) {
            if status != AttendanceStatus::Present {
                self.notifier.send(Notification {
                    to: outcome.user_id,
                    subject: format!("Attendance marked {status}"),
                    message: format!("Your attendance for {date} was marked {status}."),
                    kind: NotificationKind::AttendanceMarked,
                });
            }
        }

        if report.failed() > 0 {
            warn!(failed = report.failed(), succeeded = report.succeeded(), "Bulk mark partially failed");
        } else {
            info!(succeeded = report.succeeded(), "Bulk mark complete");
        }
        Ok(report)
    }

    /// Statistics over `[start, end]`, defaulting to the configured number
    /// of days ending `today` inclusive. Students only ever see their own
    /// numbers.
    pub async fn stats(
        &self,
        actor: Actor,
        query: StatsQuery,
        today: NaiveDate,
    ) -> AttendanceResult<StatsReport> {
        let user_id = self.scope_user(&actor, query.user_id)?;
        let end_date = query.end_date.unwrap_or(today);
        let start_date = query
            .start_date
            .unwrap_or(end_date - Duration::days((self.default_window_days - 1).max(0)));
        if start_date > end_date {
            return Err(AttendanceError::InvalidRange {
                start: start_date,
                end: end_date,
            });
        }

        let records = self
            .store
            .list_records(&AttendanceFilter {
                user_id,
                start_date: Some(start_date),
                end_date: Some(end_date),
            })
            .await?;
        let stats = AttendanceStats::aggregate(&records);

        Ok(StatsReport {
            user_id,
            start_date,
            end_date,
            grade: stats.as_ref().map(AttendanceStats::grade),
            stats,
        })
    }

    pub async fn list_records(
        &self,
        actor: Actor,
        mut filter: AttendanceFilter,
    ) -> AttendanceResult<Vec<AttendanceRecord>> {
        filter.user_id = self.scope_user(&actor, filter.user_id)?;
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(AttendanceError::InvalidRange { start, end });
            }
        }
        Ok(self.store.list_records(&filter).await?)
    }

    pub async fn today(
        &self,
        actor: Actor,
        user_id: Option<u64>,
        today: NaiveDate,
    ) -> AttendanceResult<Vec<AttendanceRecord>> {
        let filter = AttendanceFilter {
            user_id,
            start_date: Some(today),
            end_date: Some(today),
        };
        self.list_records(actor, filter).await
    }

    pub async fn settings(&self) -> AttendanceResult<AttendanceSettings> {
        Ok(self
            .store
            .get_settings()
            .await?
            .unwrap_or_else(AttendanceSettings::defaults))
    }

    pub async fn update_settings(
        &self,
        actor: Actor,
        patch: SettingsPatch,
        now: DateTime<Utc>,
    ) -> AttendanceResult<AttendanceSettings> {
        require(&actor, Capability::ManageAttendanceSettings)?;

        let current = self.settings().await?;
        let next = patch.apply(&current, now);
        next.validate().map_err(AttendanceError::InvalidSettings)?;

        let saved = self.store.save_settings(&next).await?;
        info!(admin = actor.user_id, "Attendance settings updated");
        Ok(saved)
    }

    /// Marks every student with no record on `date` absent. For today this
    /// only runs once `now` is past the auto-absent cutoff.
    #[instrument(name = "attendance_sweep", skip(self), fields(marker = actor.user_id))]
    pub async fn sweep_absentees(
        &self,
        actor: Actor,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> AttendanceResult<SweepReport> {
        require(&actor, Capability::MarkAttendance)?;

        let settings = self.settings().await?;
        if date == now.date_naive() && now.time() < settings.auto_mark_absent_after {
            return Err(AttendanceError::TooEarly(settings.auto_mark_absent_after));
        }
        if date > now.date_naive() {
            return Err(AttendanceError::InvalidRange {
                start: now.date_naive(),
                end: date,
            });
        }

        let students = self.store.list_profiles_by_role(Role::Student).await?;
        let recorded: HashSet<u64> = self
            .store
            .list_records(&AttendanceFilter {
                user_id: None,
                start_date: Some(date),
                end_date: Some(date),
            })
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();

        let missing: Vec<u64> = students
            .into_iter()
            .map(|p| p.id)
            .filter(|id| !recorded.contains(id))
            .collect();

        let mut report = SweepReport {
            date: Some(date),
            ..Default::default()
        };
        if missing.is_empty() {
            return Ok(report);
        }

        let bulk = self
            .bulk_mark(
                actor,
                &missing,
                AttendanceStatus::Absent,
                date,
                Some("No check-in before cutoff".to_string()),
                now,
            )
            .await?;
        for outcome in bulk.outcomes {
            match outcome.result {
                Ok(_) => report.marked_absent.push(outcome.user_id),
                Err(_) => report.failed.push(outcome.user_id),
            }
        }
        Ok(report)
    }

    /// Resolves which user a read is scoped to. Staff may look at anyone or
    /// everyone; everybody else is pinned to themselves.
    fn scope_user(&self, actor: &Actor, requested: Option<u64>) -> AttendanceResult<Option<u64>> {
        if actor.can(Capability::ViewAllAttendance) {
            return Ok(requested);
        }
        require(actor, Capability::ViewOwnAttendance)?;
        match requested {
            Some(id) if id != actor.user_id => Err(AttendanceError::Forbidden {
                role: actor.role,
                capability: Capability::ViewAllAttendance,
            }),
            _ => Ok(Some(actor.user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::profile::Profile;
    use crate::store::memory::MemoryStore;
    use crate::store::{AttendanceStore, ProfileStore};
    use chrono::TimeZone;

    const STUDENT: Actor = Actor {
        user_id: 10,
        role: Role::Student,
    };
    const WARDEN: Actor = Actor {
        user_id: 2,
        role: Role::Warden,
    };

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    const STUDENTS: [u64; 11] = [7, 8, 10, 11, 20, 101, 102, 103, 104, 105, 106];

    async fn enrol(store: &MemoryStore, id: u64, role: Role) {
        store
            .insert_profile(Profile {
                id,
                name: format!("Resident {id}"),
                roll_number: format!("R{id:04}"),
                phone_number: None,
                hostel_block: None,
                room_number: None,
                avatar_url: None,
                role,
                department: None,
                created_at: at(0, 0),
                updated_at: at(0, 0),
            })
            .await
            .unwrap();
    }

    async fn workflow() -> (Arc<MemoryStore>, AttendanceWorkflow) {
        let store = Arc::new(MemoryStore::new());
        for id in STUDENTS {
            enrol(&store, id, Role::Student).await;
        }
        enrol(&store, WARDEN.user_id, Role::Warden).await;
        let wf = AttendanceWorkflow::new(store.clone(), Arc::new(Notifier::new()), 30);
        (store, wf)
    }

    #[actix_web::test]
    async fn check_in_then_out() {
        let (_, wf) = workflow().await;

        let rec = wf.check_in(STUDENT, at(8, 0)).await.unwrap();
        assert_eq!(rec.status, AttendanceStatus::Present);
        assert_eq!(rec.check_in_time, Some(at(8, 0)));
        assert_eq!(rec.marked_by, Some(STUDENT.user_id));

        let rec = wf.check_out(STUDENT, at(21, 0)).await.unwrap();
        assert_eq!(rec.check_in_time, Some(at(8, 0)));
        assert_eq!(rec.check_out_time, Some(at(21, 0)));
    }

    #[actix_web::test]
    async fn second_check_in_is_rejected() {
        let (_, wf) = workflow().await;
        wf.check_in(STUDENT, at(8, 0)).await.unwrap();

        let err = wf.check_in(STUDENT, at(8, 5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateCheckIn(_)));
    }

    #[actix_web::test]
    async fn check_out_requires_check_in() {
        let (_, wf) = workflow().await;
        let err = wf.check_out(STUDENT, at(21, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NoCheckIn(_)));
    }

    #[actix_web::test]
    async fn check_out_after_staff_mark_without_check_in_fails() {
        let (_, wf) = workflow().await;
        wf.mark(WARDEN, STUDENT.user_id, AttendanceStatus::Excused, at(0, 0).date_naive(), None, at(7, 0))
            .await
            .unwrap();

        let err = wf.check_out(STUDENT, at(21, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NoCheckIn(_)));
    }

    #[actix_web::test]
    async fn double_check_out_is_rejected() {
        let (_, wf) = workflow().await;
        wf.check_in(STUDENT, at(8, 0)).await.unwrap();
        wf.check_out(STUDENT, at(21, 0)).await.unwrap();

        let err = wf.check_out(STUDENT, at(22, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedOut(_)));
    }

    #[actix_web::test]
    async fn staff_absent_mark_blocks_self_check_in() {
        let (_, wf) = workflow().await;
        let today = at(0, 0).date_naive();
        wf.mark(WARDEN, STUDENT.user_id, AttendanceStatus::Absent, today, None, at(11, 0))
            .await
            .unwrap();

        let err = wf.check_in(STUDENT, at(11, 30)).await.unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::StaffMarked {
                status: AttendanceStatus::Absent,
                ..
            }
        ));
    }

    #[actix_web::test]
    async fn students_cannot_mark() {
        let (_, wf) = workflow().await;
        let err = wf
            .mark(STUDENT, 11, AttendanceStatus::Present, at(0, 0).date_naive(), None, at(9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden { .. }));
    }

    #[actix_web::test]
    async fn remarking_keeps_one_record() {
        let (store, wf) = workflow().await;
        let day = at(0, 0).date_naive();
        wf.mark(WARDEN, 20, AttendanceStatus::Late, day, None, at(9, 0)).await.unwrap();
        let rec = wf
            .mark(WARDEN, 20, AttendanceStatus::Excused, day, Some("medical".into()), at(10, 0))
            .await
            .unwrap();

        assert_eq!(rec.status, AttendanceStatus::Excused);
        assert_eq!(rec.check_in_time, Some(at(9, 0)));
        let all = store.list_records(&AttendanceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[actix_web::test]
    async fn bulk_mark_commits_successes_despite_failures() {
        let (store, wf) = workflow().await;
        store.fail_attendance_writes_for(103);
        store.fail_attendance_writes_for(105);
        let users = [101, 102, 103, 104, 105, 106];
        let day = at(0, 0).date_naive();

        let report = wf
            .bulk_mark(WARDEN, &users, AttendanceStatus::Present, day, None, at(9, 0))
            .await
            .unwrap();

        assert_eq!(report.succeeded(), users.len() - 2);
        assert_eq!(report.failed(), 2);
        let failed: Vec<u64> = report
            .outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.user_id)
            .collect();
        assert_eq!(failed, vec![103, 105]);

        let committed = store.list_records(&AttendanceFilter::default()).await.unwrap();
        assert_eq!(committed.len(), users.len() - 2);
    }

    #[actix_web::test]
    async fn bulk_mark_ignores_duplicate_ids() {
        let (_, wf) = workflow().await;
        let report = wf
            .bulk_mark(WARDEN, &[7, 7, 8], AttendanceStatus::Absent, at(0, 0).date_naive(), None, at(9, 0))
            .await
            .unwrap();
        assert_eq!(report.outcomes.len(), 2);

        let err = wf
            .bulk_mark(WARDEN, &[], AttendanceStatus::Absent, at(0, 0).date_naive(), None, at(9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::EmptySelection));
    }

    #[actix_web::test]
    async fn stats_without_records_is_no_data() {
        let (_, wf) = workflow().await;
        let report = wf
            .stats(STUDENT, StatsQuery::default(), at(0, 0).date_naive())
            .await
            .unwrap();
        assert_eq!(report.stats, None);
        assert_eq!(report.grade, None);
        assert_eq!(report.user_id, Some(STUDENT.user_id));
    }

    #[actix_web::test]
    async fn stats_over_window() {
        let (_, wf) = workflow().await;
        let base = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        for (offset, status) in [
            (0, AttendanceStatus::Present),
            (1, AttendanceStatus::Present),
            (2, AttendanceStatus::Present),
            (3, AttendanceStatus::Late),
        ] {
            wf.mark(WARDEN, 10, status, base + Duration::days(offset), None, at(9, 0))
                .await
                .unwrap();
        }

        let report = wf
            .stats(
                WARDEN,
                StatsQuery {
                    user_id: Some(10),
                    start_date: Some(base),
                    end_date: Some(base + Duration::days(3)),
                },
                base,
            )
            .await
            .unwrap();

        let stats = report.stats.unwrap();
        assert_eq!(stats.total_days, 4);
        assert_eq!(stats.present_days, 3);
        assert_eq!(stats.attendance_percentage, 75.0);
        assert_eq!(report.grade, Some(Grade::B));
    }

    #[actix_web::test]
    async fn students_cannot_read_other_students_stats() {
        let (_, wf) = workflow().await;
        let err = wf
            .stats(
                STUDENT,
                StatsQuery {
                    user_id: Some(99),
                    ..Default::default()
                },
                at(0, 0).date_naive(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden { .. }));
    }

    #[actix_web::test]
    async fn inverted_range_is_rejected() {
        let (_, wf) = workflow().await;
        let err = wf
            .stats(
                WARDEN,
                StatsQuery {
                    user_id: None,
                    start_date: NaiveDate::from_ymd_opt(2026, 3, 5),
                    end_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                },
                at(0, 0).date_naive(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidRange { .. }));
    }

    #[actix_web::test]
    async fn settings_updates_are_admin_only_and_validated() {
        let (_, wf) = workflow().await;
        let admin = Actor::new(1, Role::Admin);
        let patch = SettingsPatch {
            late_threshold_minutes: Some(20),
            ..Default::default()
        };

        let err = wf.update_settings(WARDEN, patch.clone(), at(9, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden { .. }));

        let saved = wf.update_settings(admin, patch, at(9, 0)).await.unwrap();
        assert_eq!(saved.late_threshold_minutes, 20);
        assert_eq!(wf.settings().await.unwrap().late_threshold_minutes, 20);

        let bad = SettingsPatch {
            check_in_start: NaiveTime::from_hms_opt(12, 0, 0),
            ..Default::default()
        };
        let err = wf.update_settings(admin, bad, at(9, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidSettings(_)));
    }

    #[actix_web::test]
    async fn staff_present_mark_counts_as_todays_check_in() {
        let (_, wf) = workflow().await;
        let today = at(0, 0).date_naive();
        let rec = wf
            .mark(WARDEN, STUDENT.user_id, AttendanceStatus::Present, today, None, at(7, 0))
            .await
            .unwrap();
        assert_eq!(rec.check_in_time, Some(at(7, 0)));

        let err = wf.check_in(STUDENT, at(8, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateCheckIn(_)));
    }

    #[actix_web::test]
    async fn marking_a_past_day_leaves_check_in_empty() {
        let (_, wf) = workflow().await;
        let earlier = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();

        let rec = wf
            .mark(WARDEN, STUDENT.user_id, AttendanceStatus::Present, earlier, None, now)
            .await
            .unwrap();
        assert_eq!(rec.date, earlier);
        assert_eq!(rec.check_in_time, None);

        let rec = wf
            .mark(WARDEN, STUDENT.user_id, AttendanceStatus::Late, earlier, None, now)
            .await
            .unwrap();
        assert_eq!(rec.check_in_time, None);
    }

    #[actix_web::test]
    async fn bulk_mark_rejects_unknown_users_and_staff() {
        let (store, wf) = workflow().await;
        let day = at(0, 0).date_naive();

        let report = wf
            .bulk_mark(WARDEN, &[999_999, 10, WARDEN.user_id], AttendanceStatus::Absent, day, None, at(9, 0))
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert!(matches!(
            report.outcomes[0].result,
            Err(AttendanceError::UserNotFound(999_999))
        ));
        assert!(report.outcomes[1].result.is_ok());
        assert!(matches!(
            report.outcomes[2].result,
            Err(AttendanceError::NotAStudent {
                role: Role::Warden,
                ..
            })
        ));

        let records = store.list_records(&AttendanceFilter::default()).await.unwrap();
        let users: Vec<u64> = records.iter().map(|r| r.user_id).collect();
        assert_eq!(users, vec![10]);
    }

    #[actix_web::test]
    async fn default_stats_window_spans_configured_days() {
        let (_, wf) = workflow().await;
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let report = wf.stats(STUDENT, StatsQuery::default(), today).await.unwrap();

        assert_eq!(report.end_date, today);
        assert_eq!(report.start_date, NaiveDate::from_ymd_opt(2026, 2, 9).unwrap());
        assert_eq!((report.end_date - report.start_date).num_days() + 1, 30);
    }

    #[actix_web::test]
    async fn sweep_marks_students_without_a_record() {
        let (store, wf) = workflow().await;
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        wf.mark(WARDEN, 10, AttendanceStatus::Excused, yesterday, None, at(8, 0))
            .await
            .unwrap();

        // Past days can be swept before today's cutoff.
        let mut report = wf.sweep_absentees(WARDEN, yesterday, at(9, 0)).await.unwrap();
        report.marked_absent.sort_unstable();

        let expected: Vec<u64> = STUDENTS.iter().copied().filter(|&id| id != 10).collect();
        assert_eq!(report.date, Some(yesterday));
        assert_eq!(report.marked_absent, expected);
        assert!(report.failed.is_empty());

        let kept = store.find_record(10, yesterday).await.unwrap().unwrap();
        assert_eq!(kept.status, AttendanceStatus::Excused);
        assert_eq!(store.find_record(WARDEN.user_id, yesterday).await.unwrap(), None);
        for id in expected {
            let rec = store.find_record(id, yesterday).await.unwrap().unwrap();
            assert_eq!(rec.status, AttendanceStatus::Absent);
            assert_eq!(rec.marked_by, Some(WARDEN.user_id));
        }
    }

    #[actix_web::test]
    async fn sweep_after_cutoff_runs_once() {
        let (_, wf) = workflow().await;
        let today = at(0, 0).date_naive();
        wf.check_in(STUDENT, at(8, 0)).await.unwrap();

        let report = wf.sweep_absentees(WARDEN, today, at(11, 30)).await.unwrap();
        assert_eq!(report.marked_absent.len(), STUDENTS.len() - 1);
        assert!(!report.marked_absent.contains(&STUDENT.user_id));

        let again = wf.sweep_absentees(WARDEN, today, at(12, 0)).await.unwrap();
        assert!(again.marked_absent.is_empty());
    }

    #[actix_web::test]
    async fn sweep_rejects_future_dates() {
        let (_, wf) = workflow().await;
        let tomorrow = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let err = wf.sweep_absentees(WARDEN, tomorrow, at(23, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidRange { .. }));
    }

    #[actix_web::test]
    async fn sweep_waits_for_cutoff() {
        let (_, wf) = workflow().await;
        let err = wf
            .sweep_absentees(WARDEN, at(0, 0).date_naive(), at(10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::TooEarly(_)));
    }
}
