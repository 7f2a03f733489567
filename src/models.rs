use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{profile::Profile, role::Role};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpRequest {
    #[schema(example = "asha@hostel.edu")]
    pub email: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = "CS21B042")]
    pub roll_number: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    #[schema(example = "asha@hostel.edu")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Account email.
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}
