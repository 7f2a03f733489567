use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::service::{
    ServiceError, attendance::AttendanceError, roles::RoleError,
};
use crate::store::StoreError;

/// Error type returned by every handler. Renders as
/// `{"message": "..."}` with the matching status code.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound("Not found".into()),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "Store operation failed");
                AppError::Internal
            }
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Forbidden(_) => AppError::Forbidden(e.to_string()),
            ServiceError::Invalid(msg) => AppError::BadRequest(msg),
            ServiceError::NotFound(_) => AppError::NotFound(e.to_string()),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Store(e) => e.into(),
        }
    }
}

impl From<AttendanceError> for AppError {
    fn from(e: AttendanceError) -> Self {
        match e {
            AttendanceError::Forbidden { .. } => AppError::Forbidden(e.to_string()),
            AttendanceError::Store(e) => e.into(),
            AttendanceError::DuplicateCheckIn(_)
            | AttendanceError::NoCheckIn(_)
            | AttendanceError::AlreadyCheckedOut(_)
            | AttendanceError::StaffMarked { .. } => AppError::Conflict(e.to_string()),
            AttendanceError::InvalidRange { .. }
            | AttendanceError::InvalidSettings(_)
            | AttendanceError::TooEarly(_)
            | AttendanceError::NotAStudent { .. }
            | AttendanceError::EmptySelection => AppError::BadRequest(e.to_string()),
            AttendanceError::UserNotFound(_) => AppError::NotFound(e.to_string()),
        }
    }
}

impl From<RoleError> for AppError {
    fn from(e: RoleError) -> Self {
        match e {
            RoleError::Denied(_) => AppError::Forbidden(e.to_string()),
            RoleError::NotFound(_) => AppError::NotFound(e.to_string()),
            RoleError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn renders_message_body() {
        let resp = AppError::Conflict("Already checked in today".into()).error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Already checked in today");
    }

    #[test]
    fn database_errors_do_not_leak() {
        let err: AppError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.to_string(), "Internal Server Error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
