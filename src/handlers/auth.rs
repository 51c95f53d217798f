use crate::error::{AppError, AppResult};
use crate::models::{AppRole, ProfileModel};
use crate::response::ApiResponse;
use crate::services::access::Actor;
use crate::services::auth::{AuthService, NewAccount};
use crate::services::profile::ProfileService;
use crate::utils::jwt::access_token_ttl;
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email)]
    pub email: String,
    /// Password (min 8 characters)
    #[validate(length(min = 8))]
    pub password: String,
    /// Display name (1-100 characters)
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    /// Phone number used for claim notifications
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address
    pub email: String,
    /// User password
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// JWT access token
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    /// User ID
    pub user_id: i32,
    /// Email address
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: i32,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub reputation_score: i32,
    pub items_found: i32,
    pub items_claimed: i32,
    pub created_at: String,
}

impl From<ProfileModel> for ProfileResponse {
    fn from(p: ProfileModel) -> Self {
        Self {
            user_id: p.user_id,
            full_name: p.full_name,
            phone: p.phone,
            avatar_url: p.avatar_url,
            reputation_score: p.reputation_score,
            items_found: p.items_found,
            items_claimed: p.items_claimed,
            created_at: p.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    /// User ID
    pub id: i32,
    /// Email address
    pub email: String,
    /// Platform-wide role
    pub role: AppRole,
    /// Organizations this user administers
    pub organization_ids: Vec<i32>,
    /// Public profile
    pub profile: ProfileResponse,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 409, description = "Email already registered", body = AppError),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {e}")))?;

    let service = AuthService::new(db);
    let (user, token) = service
        .register(NewAccount {
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
            phone: payload.phone,
        })
        .await?;

    Ok(ApiResponse::with_message(
        AuthResponse {
            token,
            expires_in: access_token_ttl(),
            user_id: user.id,
            email: user.email,
        },
        "Registration successful.".to_string(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(db);
    let (user, token) = service.login(&payload.email, &payload.password).await?;

    Ok(ApiResponse::ok(AuthResponse {
        token,
        expires_in: access_token_ttl(),
        user_id: user.id,
        email: user.email,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn me(
    Extension(db): Extension<DatabaseConnection>,
    actor: Actor,
) -> AppResult<impl IntoResponse> {
    let user = AuthService::new(db.clone())
        .get_user_by_id(actor.user_id)
        .await?;
    let profile = ProfileService::new(db).get_profile(actor.user_id).await?;

    Ok(ApiResponse::ok(MeResponse {
        id: user.id,
        email: user.email,
        role: actor.global_role,
        organization_ids: actor.org_admin_of,
        profile: ProfileResponse::from(profile),
    }))
}
