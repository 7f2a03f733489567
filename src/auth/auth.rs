use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header, web::Data};
use futures::future::{Ready, ready};

use crate::{
    auth::jwt::verify_token,
    config::Config,
    error::AppError,
    model::role::{Actor, Role},
    models::{Claims, TokenType},
};

/// Identity carried by a verified access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_access_token(token: &str, secret: &str) -> Result<Self, AppError> {
        let claims: Claims = verify_token(token, secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
        })
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// The raw bearer token of a request, if any.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already verified by the auth middleware.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => return ready(Err(AppError::Unauthorized("Missing token".into()).into())),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                tracing::error!("Config missing from app data");
                return ready(Err(AppError::Internal.into()));
            }
        };

        ready(AuthUser::from_access_token(token, &config.jwt_secret).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn extracts_identity_from_bearer_header() {
        let token = generate_access_token(3, "s@hostel.edu", Role::Student, "change-me", 60).unwrap();
        let req = TestRequest::default()
            .app_data(Data::new(Config::default()))
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.actor(), Actor::new(3, Role::Student));
        assert_eq!(user.email, "s@hostel.edu");
    }

    #[actix_web::test]
    async fn refresh_tokens_do_not_authenticate() {
        let (token, _) =
            generate_refresh_token(3, "s@hostel.edu", Role::Student, "change-me", 60).unwrap();
        let err = AuthUser::from_access_token(&token, "change-me").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(Data::new(Config::default()))
            .to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());
    }
}
