use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::{
        auth::bearer_token,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::{role::Role, user::NewAccount},
    models::{Claims, SignInRequest, SignInResponse, SignUpRequest, TokenPair, TokenType},
    service::profiles::ProfileService,
    session::{SessionEvent, SessionStore},
    store::HostelStore,
    utils::{email_cache, email_filter},
};

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, store: &dyn HostelStore) -> Result<bool, AppError> {
    let email = email.trim().to_lowercase();

    // Cuckoo filter: a miss is definitive.
    if !email_filter::might_exist(&email) {
        return Ok(true);
    }

    if email_cache::is_taken(&email).await {
        return Ok(false);
    }

    let taken = store.find_account_by_email(&email).await?.is_some();
    if taken {
        email_cache::mark_taken(&email).await;
    }
    Ok(!taken)
}

fn signing_error(e: jsonwebtoken::errors::Error) -> AppError {
    error!(error = %e, "Failed to sign token");
    AppError::Internal
}

/// Issues an access/refresh pair and records the refresh token.
async fn issue_tokens(
    user_id: u64,
    email: &str,
    role: Role,
    store: &dyn HostelStore,
    config: &Config,
) -> Result<TokenPair, AppError> {
    let access_token = generate_access_token(
        user_id,
        email,
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(signing_error)?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        email,
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(signing_error)?;

    let expires_at = DateTime::<Utc>::from_timestamp(refresh_claims.exp as i64, 0)
        .ok_or(AppError::Internal)?;
    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");
    store
        .store_refresh_token(user_id, &refresh_claims.jti, expires_at)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = bearer_token(req)?;
    let claims = verify_token(token, &config.jwt_secret).ok()?;
    (claims.token_type == TokenType::Refresh).then_some(claims)
}

/// Registers a student account
#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_sign_up", skip(body, store), fields(email = %body.email))]
pub async fn sign_up(
    body: web::Json<SignUpRequest>,
    store: web::Data<dyn HostelStore>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let email = body.email.trim().to_lowercase();

    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    if body.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }
    if body.name.trim().is_empty() || body.roll_number.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name and roll number are required".into(),
        ));
    }

    if !is_email_available(&email, store.get_ref()).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&body.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal
    })?;

    let user_id = store
        .insert_account(NewAccount {
            email: email.clone(),
            password_hash,
            name: body.name.trim().to_string(),
            roll_number: body.roll_number.trim().to_string(),
            phone_number: body.phone_number,
        })
        .await?;

    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    info!(user_id, "Account registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "Account created",
        "user_id": user_id
    })))
}

/// Signs in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_sign_in",
    skip(body, store, config, profiles, sessions),
    fields(email = %body.email)
)]
pub async fn sign_in(
    body: web::Json<SignInRequest>,
    store: web::Data<dyn HostelStore>,
    config: web::Data<Config>,
    profiles: web::Data<ProfileService>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    info!("Sign-in request received");

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Email and password required".into()));
    }

    let account = match store.find_account_by_email(body.email.trim()).await? {
        Some(account) => account,
        None => {
            info!("Invalid credentials: unknown email");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    if let Err(e) = verify_password(&body.password, &account.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let now = Utc::now();
    let profile = profiles.ensure_profile(&account, now).await?;
    let tokens = issue_tokens(
        account.id,
        &account.email,
        profile.role,
        store.get_ref(),
        &config,
    )
    .await?;

    if let Err(e) = store.touch_sign_in(account.id, now).await {
        // Not fatal for the sign-in itself.
        warn!(error = %e, "Failed to record sign-in time");
    }
    email_cache::mark_taken(&account.email).await;

    sessions
        .publish(SessionEvent::SignedIn {
            user_id: account.id,
            profile: profile.clone(),
        })
        .await;

    info!(user_id = account.id, role = %profile.role, "Sign-in successful");
    Ok(HttpResponse::Ok().json(SignInResponse { tokens, profile }))
}

/// Exchanges a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<dyn HostelStore>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let claims = refresh_claims(&req, &config)
        .ok_or_else(|| AppError::Unauthorized("Refresh token required".into()))?;

    // Rotation: each refresh token is good for exactly one exchange.
    if !store.revoke_refresh_token(&claims.jti).await? {
        warn!(user_id = claims.user_id, "Reuse of revoked refresh token");
        return Err(AppError::Unauthorized("Refresh token revoked".into()));
    }

    let role = sessions
        .profile(claims.user_id)
        .await?
        .map(|p| p.role)
        .unwrap_or(claims.role);

    let tokens = issue_tokens(claims.user_id, &claims.sub, role, store.get_ref(), &config).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes a refresh token. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    responses((status = 204, description = "Signed out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn sign_out(
    req: HttpRequest,
    store: web::Data<dyn HostelStore>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> HttpResponse {
    let claims = match refresh_claims(&req, &config) {
        Some(c) => c,
        None => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = store.revoke_refresh_token(&claims.jti).await {
        warn!(error = %e, "Failed to revoke refresh token");
    }
    sessions
        .publish(SessionEvent::SignedOut {
            user_id: claims.user_id,
        })
        .await;

    HttpResponse::NoContent().finish()
}
