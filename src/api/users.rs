use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    model::profile::{Profile, ProfileUpdate},
    service::{profiles::ProfileService, roles::RoleService},
    session::{Session, SessionEvent, SessionStore},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PromoteWarden {
    #[schema(example = "Block B")]
    pub department: Option<String>,
}

/// All users, newest first
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All profiles", body = Vec<Profile>),
        (status = 403, description = "Wardens and admins only")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    session: Session,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse, AppError> {
    let users = profiles.list_users(session.actor()).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    session: Session,
    path: web::Path<u64>,
    body: web::Json<ProfileUpdate>,
    profiles: web::Data<ProfileService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let profile = profiles
        .update_user(session.actor(), path.into_inner(), &body, Utc::now())
        .await?;
    sessions
        .publish(SessionEvent::ProfileChanged(profile.clone()))
        .await;
    Ok(HttpResponse::Ok().json(profile))
}

async fn role_changed(profile: Profile, sessions: &SessionStore) -> HttpResponse {
    sessions
        .publish(SessionEvent::ProfileChanged(profile.clone()))
        .await;
    HttpResponse::Ok().json(profile)
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/promote-admin",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Promoted", body = Profile),
        (status = 403, description = "Not allowed to make this change"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn promote_admin(
    session: Session,
    path: web::Path<u64>,
    roles: web::Data<RoleService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let profile = roles
        .promote_to_admin(session.actor(), path.into_inner())
        .await?;
    Ok(role_changed(profile, &sessions).await)
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/promote-warden",
    params(("id" = u64, Path, description = "User id")),
    request_body = PromoteWarden,
    responses(
        (status = 200, description = "Promoted", body = Profile),
        (status = 403, description = "Not allowed to make this change"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn promote_warden(
    session: Session,
    path: web::Path<u64>,
    body: Option<web::Json<PromoteWarden>>,
    roles: web::Data<RoleService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let department = body.and_then(|b| b.into_inner().department);
    let profile = roles
        .promote_to_warden(session.actor(), path.into_inner(), department)
        .await?;
    Ok(role_changed(profile, &sessions).await)
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/demote-student",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Demoted", body = Profile),
        (status = 403, description = "Not allowed to make this change"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn demote_student(
    session: Session,
    path: web::Path<u64>,
    roles: web::Data<RoleService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let profile = roles
        .demote_to_student(session.actor(), path.into_inner())
        .await?;
    Ok(role_changed(profile, &sessions).await)
}
