use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppError,
    model::attendance::{
        AttendanceFilter, AttendanceRecord, AttendanceSettings, AttendanceStatus, SettingsPatch,
    },
    service::attendance::{AttendanceWorkflow, BulkMarkReport, StatsQuery, StatsReport, SweepReport},
    session::Session,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkRequest {
    #[schema(example = json!([12, 15, 19]))]
    pub user_ids: Vec<u64>,
    #[schema(example = "absent")]
    pub status: AttendanceStatus,
    /// Defaults to today.
    #[schema(example = "2026-03-02", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkResult {
    pub user_id: u64,
    pub record: Option<AttendanceRecord>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkResponse {
    #[schema(example = 3)]
    pub succeeded: usize,
    #[schema(example = 0)]
    pub failed: usize,
    pub results: Vec<MarkResult>,
}

impl From<BulkMarkReport> for MarkResponse {
    fn from(report: BulkMarkReport) -> Self {
        let succeeded = report.succeeded();
        let failed = report.failed();
        let results = report
            .outcomes
            .into_iter()
            .map(|o| match o.result {
                Ok(record) => MarkResult {
                    user_id: o.user_id,
                    record: Some(record),
                    error: None,
                },
                Err(e) => MarkResult {
                    user_id: o.user_id,
                    record: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        MarkResponse {
            succeeded,
            failed,
            results,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsParams {
    /// Staff only. Omit for everyone (staff) or yourself (students).
    pub user_id: Option<u64>,
    /// Defaults to the configured window before `end_date`.
    #[param(value_type = Option<String>, example = "2026-02-01")]
    pub start_date: Option<NaiveDate>,
    /// Defaults to today.
    #[param(value_type = Option<String>, example = "2026-03-02")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TodayParams {
    pub user_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SweepRequest {
    /// Defaults to today.
    #[schema(format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

/// Check-in for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 200, description = "Checked in", body = AttendanceRecord),
        (status = 409, description = "Already checked in, or day closed by a staff mark", body = Object, example = json!({
            "message": "Already checked in on 2026-03-02"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    session: Session,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let record = attendance.check_in(session.actor(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Check-out for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out", body = AttendanceRecord),
        (status = 409, description = "No check-in today, or already checked out", body = Object, example = json!({
            "message": "No check-in found for 2026-03-02"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    session: Session,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let record = attendance.check_out(session.actor(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// List attendance records, newest first
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Attendance records", body = Vec<AttendanceRecord>),
        (status = 400, description = "Start date after end date"),
        (status = 403, description = "Students may only list their own records")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_records(
    session: Session,
    query: web::Query<AttendanceFilter>,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let records = attendance
        .list_records(session.actor(), query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Today's records
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    params(TodayParams),
    responses((status = 200, description = "Today's records", body = Vec<AttendanceRecord>)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    session: Session,
    query: web::Query<TodayParams>,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let records = attendance
        .today(session.actor(), query.user_id, Utc::now().date_naive())
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Staff mark of one or more students
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkRequest,
    responses(
        (status = 200, description = "Per-student results; failures do not roll back successes", body = MarkResponse),
        (status = 400, description = "No users selected"),
        (status = 403, description = "Wardens and admins only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark(
    session: Session,
    body: web::Json<MarkRequest>,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let now = Utc::now();
    let report = attendance
        .bulk_mark(
            session.actor(),
            &body.user_ids,
            body.status,
            body.date.unwrap_or_else(|| now.date_naive()),
            body.notes,
            now,
        )
        .await?;
    Ok(HttpResponse::Ok().json(MarkResponse::from(report)))
}

/// Attendance statistics and grade
#[utoipa::path(
    get,
    path = "/api/attendance/stats",
    params(StatsParams),
    responses(
        (status = 200, description = "Statistics; `stats` is null when the window has no records", body = StatsReport),
        (status = 400, description = "Start date after end date")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn stats(
    session: Session,
    query: web::Query<StatsParams>,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let report = attendance
        .stats(
            session.actor(),
            StatsQuery {
                user_id: query.user_id,
                start_date: query.start_date,
                end_date: query.end_date,
            },
            Utc::now().date_naive(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/attendance/settings",
    responses((status = 200, description = "Current attendance settings", body = AttendanceSettings)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_settings(
    _session: Session,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(attendance.settings().await?))
}

#[utoipa::path(
    put,
    path = "/api/attendance/settings",
    request_body = SettingsPatch,
    responses(
        (status = 200, description = "Updated settings", body = AttendanceSettings),
        (status = 400, description = "Windows out of order"),
        (status = 403, description = "Admins only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_settings(
    session: Session,
    body: web::Json<SettingsPatch>,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let settings = attendance
        .update_settings(session.actor(), body.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// Mark every student without a record as absent
#[utoipa::path(
    post,
    path = "/api/attendance/sweep",
    request_body = SweepRequest,
    responses(
        (status = 200, description = "Students marked absent", body = SweepReport),
        (status = 400, description = "Cutoff not reached yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn sweep(
    session: Session,
    body: Option<web::Json<SweepRequest>>,
    attendance: web::Data<AttendanceWorkflow>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let date = body
        .and_then(|b| b.into_inner().date)
        .unwrap_or_else(|| now.date_naive());
    let report = attendance
        .sweep_absentees(session.actor(), date, now)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}
