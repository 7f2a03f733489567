use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::{
    error::AppError,
    model::profile::{Profile, ProfileUpdate},
    service::profiles::ProfileService,
    session::{Session, SessionEvent, SessionStore},
};

/// Own profile. `null` when no profile exists yet.
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Own profile, or null", body = Option<Profile>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    session: Session,
    profiles: web::Data<ProfileService>,
) -> Result<HttpResponse, AppError> {
    let profile = profiles.get_own(session.actor()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Nothing to update"),
        (status = 404, description = "No profile yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_profile(
    session: Session,
    body: web::Json<ProfileUpdate>,
    profiles: web::Data<ProfileService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let profile = profiles
        .update_own(session.actor(), &body, Utc::now())
        .await?;
    sessions
        .publish(SessionEvent::ProfileChanged(profile.clone()))
        .await;
    Ok(HttpResponse::Ok().json(profile))
}
