use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::{IntoParams, ToSchema};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    /// Statuses staff assign without a check-in. A student cannot check in
    /// over them on the same day.
    pub fn locks_self_service(self) -> bool {
        !matches!(self, AttendanceStatus::Present)
    }

    /// Whether a same-day staff mark with this status stamps the check time
    /// as a check-in.
    pub fn records_arrival(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    #[schema(example = "2026-01-01T07:58:00Z", format = "date-time", value_type = Option<String>)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(example = "2026-01-01T21:30:00Z", format = "date-time", value_type = Option<String>)]
    pub check_out_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Who recorded the entry; the student themself for check-ins.
    pub marked_by: Option<u64>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// A write against the (user, date) slot. Used for both self-service and
/// staff marks so both stores share one upsert path.
#[derive(Debug, Clone)]
pub struct AttendanceMark {
    pub user_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub marked_by: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilter {
    /// Students may only pass their own id.
    pub user_id: Option<u64>,
    /// Inclusive.
    #[param(value_type = Option<String>, example = "2026-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive.
    #[param(value_type = Option<String>, example = "2026-01-31")]
    pub end_date: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.user_id.is_none_or(|u| record.user_id == u)
            && self.start_date.is_none_or(|d| record.date >= d)
            && self.end_date.is_none_or(|d| record.date <= d)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceStats {
    #[schema(example = 30)]
    pub total_days: u32,
    #[schema(example = 25)]
    pub present_days: u32,
    #[schema(example = 2)]
    pub absent_days: u32,
    #[schema(example = 2)]
    pub late_days: u32,
    #[schema(example = 1)]
    pub excused_days: u32,
    #[schema(example = 83.33)]
    pub attendance_percentage: f64,
}

impl AttendanceStats {
    /// Folds a window of records into counts. An empty window has no
    /// percentage, so it yields `None` rather than a zero.
    pub fn aggregate<'a, I>(records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        let mut stats = AttendanceStats {
            total_days: 0,
            present_days: 0,
            absent_days: 0,
            late_days: 0,
            excused_days: 0,
            attendance_percentage: 0.0,
        };

        for record in records {
            stats.total_days += 1;
            match record.status {
                AttendanceStatus::Present => stats.present_days += 1,
                AttendanceStatus::Absent => stats.absent_days += 1,
                AttendanceStatus::Late => stats.late_days += 1,
                AttendanceStatus::Excused => stats.excused_days += 1,
            }
        }

        if stats.total_days == 0 {
            return None;
        }

        stats.attendance_percentage =
            stats.present_days as f64 / stats.total_days as f64 * 100.0;
        Some(stats)
    }

    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.attendance_percentage)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, ToSchema)]
pub enum Grade {
    #[serde(rename = "A+")]
    #[strum(serialize = "A+")]
    APlus,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Grade::APlus
        } else if percentage >= 80.0 {
            Grade::A
        } else if percentage >= 70.0 {
            Grade::B
        } else if percentage >= 60.0 {
            Grade::C
        } else {
            Grade::D
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceSettings {
    pub id: u64,
    #[schema(example = "06:00:00", value_type = String)]
    pub check_in_start: NaiveTime,
    #[schema(example = "10:00:00", value_type = String)]
    pub check_in_end: NaiveTime,
    #[schema(example = "18:00:00", value_type = String)]
    pub check_out_start: NaiveTime,
    #[schema(example = "23:00:00", value_type = String)]
    pub check_out_end: NaiveTime,
    #[schema(example = 15)]
    pub late_threshold_minutes: u32,
    #[schema(example = "11:00:00", value_type = String)]
    pub auto_mark_absent_after: NaiveTime,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceSettings {
    pub fn defaults() -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            id: 1,
            check_in_start: t(6, 0),
            check_in_end: t(10, 0),
            check_out_start: t(18, 0),
            check_out_end: t(23, 0),
            late_threshold_minutes: 15,
            auto_mark_absent_after: t(11, 0),
            updated_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.check_in_start > self.check_in_end {
            return Err("check-in window starts after it ends");
        }
        if self.check_out_start > self.check_out_end {
            return Err("check-out window starts after it ends");
        }
        if self.auto_mark_absent_after < self.check_in_start {
            return Err("auto-absent cutoff precedes the check-in window");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SettingsPatch {
    #[schema(value_type = Option<String>, example = "06:30:00")]
    pub check_in_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub check_in_end: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub check_out_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub check_out_end: Option<NaiveTime>,
    pub late_threshold_minutes: Option<u32>,
    #[schema(value_type = Option<String>)]
    pub auto_mark_absent_after: Option<NaiveTime>,
}

impl SettingsPatch {
    pub fn apply(&self, current: &AttendanceSettings, at: DateTime<Utc>) -> AttendanceSettings {
        AttendanceSettings {
            id: current.id,
            check_in_start: self.check_in_start.unwrap_or(current.check_in_start),
            check_in_end: self.check_in_end.unwrap_or(current.check_in_end),
            check_out_start: self.check_out_start.unwrap_or(current.check_out_start),
            check_out_end: self.check_out_end.unwrap_or(current.check_out_end),
            late_threshold_minutes: self
                .late_threshold_minutes
                .unwrap_or(current.late_threshold_minutes),
            auto_mark_absent_after: self
                .auto_mark_absent_after
                .unwrap_or(current.auto_mark_absent_after),
            updated_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: u64, day: u32, status: AttendanceStatus) -> AttendanceRecord {
        let now = Utc::now();
        AttendanceRecord {
            id: day as u64,
            user_id,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            status,
            check_in_time: None,
            check_out_time: None,
            notes: None,
            marked_by: Some(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_window_has_no_stats() {
        let none: Vec<AttendanceRecord> = Vec::new();
        assert_eq!(AttendanceStats::aggregate(&none), None);
    }

    #[test]
    fn percentage_counts_only_present_days() {
        use AttendanceStatus::*;
        let records = vec![
            record(7, 1, Present),
            record(7, 2, Present),
            record(7, 3, Late),
            record(7, 4, Absent),
            record(7, 5, Excused),
        ];

        let stats = AttendanceStats::aggregate(&records).unwrap();
        assert_eq!(stats.total_days, 5);
        assert_eq!(stats.present_days, 2);
        assert_eq!(stats.late_days, 1);
        assert_eq!(stats.absent_days, 1);
        assert_eq!(stats.excused_days, 1);
        assert!((stats.attendance_percentage - 40.0).abs() < f64::EPSILON);
        assert_eq!(stats.grade(), Grade::D);
    }

    #[test]
    fn grade_bands() {
        assert_eq!(Grade::from_percentage(92.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(85.0), Grade::A);
        assert_eq!(Grade::from_percentage(72.0), Grade::B);
        assert_eq!(Grade::from_percentage(65.0), Grade::C);
        assert_eq!(Grade::from_percentage(50.0), Grade::D);
    }

    #[test]
    fn grade_boundaries_belong_to_the_higher_band() {
        assert_eq!(Grade::from_percentage(90.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(80.0), Grade::A);
        assert_eq!(Grade::from_percentage(70.0), Grade::B);
        assert_eq!(Grade::from_percentage(60.0), Grade::C);
        assert_eq!(Grade::from_percentage(59.99), Grade::D);
        assert_eq!(Grade::APlus.to_string(), "A+");
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let r = record(3, 10, AttendanceStatus::Present);
        let filter = AttendanceFilter {
            user_id: Some(3),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 10),
        };
        assert!(filter.matches(&r));
        assert!(!AttendanceFilter { user_id: Some(4), ..Default::default() }.matches(&r));
    }

    #[test]
    fn settings_patch_keeps_unset_fields() {
        let current = AttendanceSettings::defaults();
        let patch = SettingsPatch {
            late_threshold_minutes: Some(5),
            ..Default::default()
        };
        let next = patch.apply(&current, Utc::now());
        assert_eq!(next.late_threshold_minutes, 5);
        assert_eq!(next.check_in_start, current.check_in_start);
        assert!(next.validate().is_ok());
    }

    #[test]
    fn inverted_window_is_invalid() {
        let mut s = AttendanceSettings::defaults();
        s.check_out_start = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert!(s.validate().is_err());
    }
}
