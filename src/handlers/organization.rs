use crate::error::{AppError, AppResult};
use crate::events::ChangeFeed;
use crate::middleware::OptionalActor;
use crate::models::{OrganizationAdminModel, OrganizationModel, ReviewStatus};
use crate::response::{page_window, ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::access::Actor;
use crate::services::organization::{NewOrganization, OrganizationService, OrganizationStats};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterOrganizationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// e.g. mall, airport, university
    #[validate(length(min = 1, max = 50))]
    pub org_type: String,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(email)]
    pub contact_email: String,
    #[validate(length(min = 1, max = 20))]
    pub contact_phone: String,
    #[validate(length(max = 500))]
    pub logo_url: Option<String>,
    /// Geofence radius, defaults to 500
    #[validate(range(min = 1, max = 50000))]
    pub radius_meters: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignAdminRequest {
    pub user_id: i32,
    /// Defaults to "admin"
    #[validate(length(max = 20))]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewQueueQuery {
    /// pending, approved or rejected
    pub review_status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationResponse {
    pub id: i32,
    pub name: String,
    pub org_type: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_email: String,
    pub contact_phone: String,
    pub logo_url: Option<String>,
    pub radius_meters: i32,
    pub require_location_verification: bool,
    pub is_verified: bool,
    pub is_active: bool,
    pub review_status: ReviewStatus,
    pub created_at: String,
}

impl From<OrganizationModel> for OrganizationResponse {
    fn from(o: OrganizationModel) -> Self {
        Self {
            id: o.id,
            name: o.name,
            org_type: o.org_type,
            address: o.address,
            city: o.city,
            latitude: o.latitude,
            longitude: o.longitude,
            contact_email: o.contact_email,
            contact_phone: o.contact_phone,
            logo_url: o.logo_url,
            radius_meters: o.radius_meters,
            require_location_verification: o.require_location_verification,
            is_verified: o.is_verified,
            is_active: o.is_active,
            review_status: o.review_status,
            created_at: o.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationAdminResponse {
    pub id: i32,
    pub organization_id: i32,
    pub user_id: i32,
    pub role: String,
    pub created_at: String,
}

impl From<OrganizationAdminModel> for OrganizationAdminResponse {
    fn from(a: OrganizationAdminModel) -> Self {
        Self {
            id: a.id,
            organization_id: a.organization_id,
            user_id: a.user_id,
            role: a.role,
            created_at: a.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationStatsResponse {
    pub total_items: u64,
    pub pending_verifications: u64,
    pub admins: u64,
}

impl From<OrganizationStats> for OrganizationStatsResponse {
    fn from(s: OrganizationStats) -> Self {
        Self {
            total_items: s.total_items,
            pending_verifications: s.pending_verifications,
            admins: s.admins,
        }
    }
}

fn paginated(
    orgs: Vec<OrganizationModel>,
    total: u64,
    page: u64,
    per_page: u64,
) -> PaginatedResponse<OrganizationResponse> {
    let items = orgs.into_iter().map(OrganizationResponse::from).collect();
    PaginatedResponse::new(items, total, page, per_page)
}

#[utoipa::path(
    post,
    path = "/api/v1/organizations",
    security(("jwt_token" = [])),
    request_body = RegisterOrganizationRequest,
    responses(
        (status = 200, description = "Submitted for review", body = OrganizationResponse),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "organizations"
)]
pub async fn register_organization(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Json(payload): Json<RegisterOrganizationRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let org = OrganizationService::new(db, feed)
        .register(NewOrganization {
            name: payload.name,
            org_type: payload.org_type,
            address: payload.address,
            city: payload.city,
            latitude: payload.latitude,
            longitude: payload.longitude,
            contact_email: payload.contact_email,
            contact_phone: payload.contact_phone,
            logo_url: payload.logo_url,
            radius_meters: payload.radius_meters,
        })
        .await?;
    tracing::debug!(organization_id = org.id, submitted_by = actor.user_id, "Organization submitted");

    Ok(ApiResponse::with_message(
        OrganizationResponse::from(org),
        "Organization submitted for review".to_string(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Active organizations", body = PaginatedResponse<OrganizationResponse>),
    ),
    tag = "organizations"
)]
pub async fn list_organizations(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.window();

    let (orgs, total) = OrganizationService::new(db, feed)
        .list_active(page, per_page)
        .await?;
    Ok(ApiResponse::ok(paginated(orgs, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}",
    params(("id" = i32, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization", body = OrganizationResponse),
        (status = 404, description = "Not found or not yet approved", body = AppError),
    ),
    tag = "organizations"
)]
pub async fn get_organization(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    OptionalActor(actor): OptionalActor,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let org = OrganizationService::new(db, feed)
        .get_visible(actor.as_ref(), id)
        .await?;
    Ok(ApiResponse::ok(OrganizationResponse::from(org)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/organizations/{id}/approve",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Approved and activated", body = OrganizationResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn approve_organization(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    actor.require_admin()?;
    let org = OrganizationService::new(db, feed).approve(id).await?;
    Ok(ApiResponse::ok(OrganizationResponse::from(org)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/organizations/{id}/reject",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Rejected", body = OrganizationResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn reject_organization(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    actor.require_admin()?;
    let org = OrganizationService::new(db, feed).reject(id).await?;
    Ok(ApiResponse::ok(OrganizationResponse::from(org)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/organizations",
    security(("jwt_token" = [])),
    params(
        ("review_status" = Option<String>, Query, description = "pending, approved or rejected"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Review queue", body = PaginatedResponse<OrganizationResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_review_queue(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Query(params): Query<ReviewQueueQuery>,
) -> AppResult<impl IntoResponse> {
    actor.require_admin()?;

    let review_status = match params.review_status.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<ReviewStatus>()?),
        _ => None,
    };
    let (page, per_page) = page_window(params.page, params.per_page);

    let (orgs, total) = OrganizationService::new(db, feed)
        .list_for_review(review_status, page, per_page)
        .await?;
    Ok(ApiResponse::ok(paginated(orgs, total, page, per_page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{id}/admins",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Organization ID")),
    request_body = AssignAdminRequest,
    responses(
        (status = 200, description = "Admin assigned", body = OrganizationAdminResponse),
        (status = 403, description = "Not allowed to manage this organization", body = AppError),
    ),
    tag = "organizations"
)]
pub async fn assign_admin(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<AssignAdminRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let admin = OrganizationService::new(db, feed)
        .assign_admin(&actor, id, payload.user_id, payload.role)
        .await?;
    Ok(ApiResponse::ok(OrganizationAdminResponse::from(admin)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}/admins",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization admins", body = Vec<OrganizationAdminResponse>),
        (status = 403, description = "Not allowed to manage this organization", body = AppError),
    ),
    tag = "organizations"
)]
pub async fn list_admins(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let admins = OrganizationService::new(db, feed)
        .list_admins(&actor, id)
        .await?;
    let items: Vec<OrganizationAdminResponse> = admins
        .into_iter()
        .map(OrganizationAdminResponse::from)
        .collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{id}/admins/{admin_id}",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Organization ID"),
        ("admin_id" = i32, Path, description = "Organization admin link ID"),
    ),
    responses(
        (status = 200, description = "Admin removed"),
        (status = 403, description = "Not allowed to manage this organization", body = AppError),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "organizations"
)]
pub async fn remove_admin(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path((id, admin_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    OrganizationService::new(db, feed)
        .remove_admin(&actor, id, admin_id)
        .await?;
    Ok(ApiResponse::with_message((), "Admin removed".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}/stats",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Dashboard figures", body = OrganizationStatsResponse),
        (status = 403, description = "Not allowed to manage this organization", body = AppError),
    ),
    tag = "organizations"
)]
pub async fn organization_stats(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let stats = OrganizationService::new(db, feed).stats(&actor, id).await?;
    Ok(ApiResponse::ok(OrganizationStatsResponse::from(stats)))
}
