use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::{
    error::AppError,
    model::notice::{NewNotice, Notice},
    service::notices::NoticeService,
    session::Session,
};

/// Up to ten active notices, highest priority first
#[utoipa::path(
    get,
    path = "/api/notices",
    responses((status = 200, description = "Active notices", body = Vec<Notice>)),
    security(("bearer_auth" = [])),
    tag = "Notices"
)]
pub async fn list_notices(
    _session: Session,
    notices: web::Data<NoticeService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(notices.active(Utc::now()).await?))
}

#[utoipa::path(
    post,
    path = "/api/notices",
    request_body = NewNotice,
    responses(
        (status = 201, description = "Notice published", body = Notice),
        (status = 400, description = "Missing fields or already expired"),
        (status = 403, description = "Wardens and admins only")
    ),
    security(("bearer_auth" = [])),
    tag = "Notices"
)]
pub async fn publish_notice(
    session: Session,
    body: web::Json<NewNotice>,
    notices: web::Data<NoticeService>,
) -> Result<HttpResponse, AppError> {
    let notice = notices.publish(session.actor(), &body, Utc::now()).await?;
    Ok(HttpResponse::Created().json(notice))
}
