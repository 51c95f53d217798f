use crate::error::{AppError, AppResult};
use crate::events::ChangeFeed;
use crate::models::{AppRole, UserModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::access::Actor;
use crate::services::admin::AdminService;
use crate::services::item::ItemService;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    /// "admin" or "user"
    #[validate(length(min = 1, max = 20))]
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_items: u64,
    pub total_users: u64,
    pub pending_verifications: u64,
    pub pending_organizations: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserResponse {
    pub id: i32,
    pub email: String,
    pub role: AppRole,
    pub created_at: String,
}

impl From<(UserModel, AppRole)> for AdminUserResponse {
    fn from((u, role): (UserModel, AppRole)) -> Self {
        Self {
            id: u.id,
            email: u.email,
            role,
            created_at: u.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExpireItemsResponse {
    /// Number of expired items removed
    pub deleted: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Platform statistics", body = StatsResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn get_stats(
    Extension(db): Extension<DatabaseConnection>,
    actor: Actor,
) -> AppResult<impl IntoResponse> {
    actor.require_admin()?;

    let stats = AdminService::new(db).get_stats().await?;

    Ok(ApiResponse::ok(StatsResponse {
        total_items: stats.total_items,
        total_users: stats.total_users,
        pending_verifications: stats.pending_verifications,
        pending_organizations: stats.pending_organizations,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "List of users", body = PaginatedResponse<AdminUserResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_users(
    Extension(db): Extension<DatabaseConnection>,
    actor: Actor,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    actor.require_admin()?;

    let (page, per_page) = params.window();

    let (users, total) = AdminService::new(db).list_users(page, per_page).await?;
    let items = users.into_iter().map(AdminUserResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Global role updated", body = AppRole),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn update_user_role(
    Extension(db): Extension<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    actor.require_admin()?;
    let role: AppRole = payload.role.parse()?;

    let role = AdminService::new(db)
        .set_user_role(actor.user_id, id, role)
        .await?;

    Ok(ApiResponse::ok(role))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/items/expire",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Expired items removed", body = ExpireItemsResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn expire_items(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
) -> AppResult<impl IntoResponse> {
    actor.require_admin()?;

    let now = chrono::Utc::now().naive_utc();
    let deleted = ItemService::new(db, feed).delete_expired(now).await?;

    Ok(ApiResponse::ok(ExpireItemsResponse { deleted }))
}
