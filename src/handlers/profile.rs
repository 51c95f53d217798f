use crate::error::{AppError, AppResult};
use crate::handlers::auth::ProfileResponse;
use crate::response::ApiResponse;
use crate::services::access::Actor;
use crate::services::profile::{ProfileService, ProfileUpdate};
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    /// Display name (1-100 characters)
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    /// Phone number; empty string clears it
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    /// Avatar URL; empty string clears it
    #[validate(length(max = 500))]
    pub avatar_url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{user_id}",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Public profile", body = ProfileResponse),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "profiles"
)]
pub async fn get_profile(
    Extension(db): Extension<DatabaseConnection>,
    Path(user_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let profile = ProfileService::new(db).get_profile(user_id).await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

#[utoipa::path(
    put,
    path = "/api/v1/profiles/me",
    security(("jwt_token" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "profiles"
)]
pub async fn update_my_profile(
    Extension(db): Extension<DatabaseConnection>,
    actor: Actor,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = ProfileService::new(db)
        .update_profile(
            actor.user_id,
            ProfileUpdate {
                full_name: payload.full_name,
                phone: payload.phone,
                avatar_url: payload.avatar_url,
            },
        )
        .await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}
