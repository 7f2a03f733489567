use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    model::complaint::{Complaint, ComplaintStatus, NewComplaint},
    service::complaints::ComplaintService,
    session::Session,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdate {
    #[schema(example = "in-progress")]
    pub status: ComplaintStatus,
}

#[utoipa::path(
    get,
    path = "/api/complaints",
    responses((status = 200, description = "Complaints, newest first", body = Vec<Complaint>)),
    security(("bearer_auth" = [])),
    tag = "Complaints"
)]
pub async fn list_complaints(
    session: Session,
    complaints: web::Data<ComplaintService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(complaints.list(session.actor()).await?))
}

#[utoipa::path(
    post,
    path = "/api/complaints",
    request_body = NewComplaint,
    responses(
        (status = 201, description = "Complaint filed", body = Complaint),
        (status = 400, description = "Title or description missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Complaints"
)]
pub async fn create_complaint(
    session: Session,
    body: web::Json<NewComplaint>,
    complaints: web::Data<ComplaintService>,
) -> Result<HttpResponse, AppError> {
    let complaint = complaints.file(session.actor(), &body, Utc::now()).await?;
    Ok(HttpResponse::Created().json(complaint))
}

#[utoipa::path(
    put,
    path = "/api/complaints/{id}/status",
    params(("id" = u64, Path, description = "Complaint id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status updated", body = Complaint),
        (status = 403, description = "Wardens and admins only"),
        (status = 404, description = "Complaint not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Complaints"
)]
pub async fn update_status(
    session: Session,
    path: web::Path<u64>,
    body: web::Json<StatusUpdate>,
    complaints: web::Data<ComplaintService>,
) -> Result<HttpResponse, AppError> {
    let complaint = complaints
        .set_status(session.actor(), path.into_inner(), body.status, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(complaint))
}
