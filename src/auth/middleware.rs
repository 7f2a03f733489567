use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    web::Data,
};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;

/// Rejects requests without a valid access token and stores the verified
/// [`AuthUser`] in the request extensions for the extractors downstream.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = match req.app_data::<Data<Config>>() {
        Some(config) => config.jwt_secret.clone(),
        None => {
            tracing::error!("App config missing");
            return Ok(req.into_response(AppError::Internal.error_response()));
        }
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_owned);

    let token = match token {
        Some(t) => t,
        None => {
            let err = AppError::Unauthorized("Missing or malformed Authorization header".into());
            return Ok(req.into_response(err.error_response()));
        }
    };

    match AuthUser::from_access_token(&token, &secret) {
        Ok(user) => {
            tracing::debug!(user_id = user.user_id, role = %user.role, "Request authenticated");
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(err) => Ok(req.into_response(err.error_response())),
    }
}
