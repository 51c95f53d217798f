use crate::config::WorkflowConfig;
use crate::error::{AppError, AppResult};
use crate::events::ChangeFeed;
use crate::models::{ItemCategory, ItemModel, ItemStatus};
use crate::response::{page_window, ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::access::Actor;
use crate::services::item::{ItemFilter, ItemService, NewItem};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    /// Short title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Free-text description
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    /// One of: electronics, wallets_purses, keys, bags, documents, jewelry, clothing, accessories, other
    pub category: String,
    /// City where the item was found
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    /// Area or neighbourhood
    #[validate(length(min = 1, max = 100))]
    pub area: String,
    /// Landmark or exact spot
    #[validate(length(min = 1, max = 255))]
    pub specific_location: String,
    /// Date the item was found (YYYY-MM-DD)
    pub date_found: NaiveDate,
    /// Image URLs, in display order
    #[serde(default)]
    #[validate(length(max = 10))]
    pub image_urls: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Organization the item was handed in to
    pub organization_id: Option<i32>,
    /// How the finder prefers to be contacted
    #[validate(length(max = 50))]
    pub contact_method: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemStatusRequest {
    /// One of: available, claimed, verified, returned
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListItemsQuery {
    /// Text matched against title and description
    pub q: Option<String>,
    pub category: Option<String>,
    /// Exact city
    pub city: Option<String>,
    /// Created at or after (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    pub since: Option<String>,
    /// Created at or before (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    pub until: Option<String>,
    pub organization_id: Option<i32>,
    pub status: Option<String>,
    /// Page number
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

impl ListItemsQuery {
    fn into_filter(self) -> AppResult<ItemFilter> {
        let category = match self.category.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<ItemCategory>()?),
            _ => None,
        };
        let status = match self.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<ItemStatus>()?),
            _ => None,
        };
        let since = self
            .since
            .as_deref()
            .map(|raw| parse_time_bound(raw, false))
            .transpose()?;
        let until = self
            .until
            .as_deref()
            .map(|raw| parse_time_bound(raw, true))
            .transpose()?;

        Ok(ItemFilter {
            text: self.q,
            category,
            city: self.city,
            since,
            until,
            organization_id: self.organization_id,
            status,
        }
        .normalized())
    }
}

/// Accept a bare date (start or end of that day) or a full timestamp.
fn parse_time_bound(raw: &str, end_of_day: bool) -> AppResult<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        return time.ok_or_else(|| AppError::Validation(format!("Invalid date: {}", raw)));
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| AppError::Validation(format!("Invalid date: {}", raw)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: i32,
    pub finder_id: i32,
    pub organization_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub city: String,
    pub area: String,
    pub specific_location: String,
    pub date_found: String,
    pub image_urls: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_method: Option<String>,
    pub status: ItemStatus,
    pub views: i32,
    pub expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ItemModel> for ItemResponse {
    fn from(i: ItemModel) -> Self {
        Self {
            id: i.id,
            finder_id: i.finder_id,
            organization_id: i.organization_id,
            title: i.title,
            description: i.description,
            category: i.category,
            city: i.city,
            area: i.area,
            specific_location: i.specific_location,
            date_found: i.date_found.to_string(),
            image_urls: i.image_urls,
            latitude: i.latitude,
            longitude: i.longitude,
            contact_method: i.contact_method,
            status: i.status,
            views: i.views,
            expires_at: i.expires_at.to_string(),
            created_at: i.created_at.to_string(),
            updated_at: i.updated_at.to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    security(("jwt_token" = [])),
    request_body = CreateItemRequest,
    responses(
        (status = 200, description = "Item posted", body = ItemResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "items"
)]
pub async fn create_item(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    Extension(workflow): Extension<WorkflowConfig>,
    actor: Actor,
    Json(payload): Json<CreateItemRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let category: ItemCategory = payload.category.parse()?;

    let service = ItemService::new(db, feed);
    let item = service
        .create_item(
            actor.user_id,
            NewItem {
                title: payload.title,
                description: payload.description,
                category,
                city: payload.city,
                area: payload.area,
                specific_location: payload.specific_location,
                date_found: payload.date_found,
                image_urls: payload.image_urls,
                latitude: payload.latitude,
                longitude: payload.longitude,
                organization_id: payload.organization_id,
                contact_method: payload.contact_method,
            },
            workflow.item_ttl,
        )
        .await?;

    Ok(ApiResponse::ok(ItemResponse::from(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(
        ("q" = Option<String>, Query, description = "Search title and description"),
        ("category" = Option<String>, Query, description = "Category"),
        ("city" = Option<String>, Query, description = "Exact city"),
        ("since" = Option<String>, Query, description = "Created at or after"),
        ("until" = Option<String>, Query, description = "Created at or before"),
        ("organization_id" = Option<i32>, Query, description = "Organization"),
        ("status" = Option<String>, Query, description = "Item status"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Matching items, newest first", body = PaginatedResponse<ItemResponse>),
        (status = 400, description = "Invalid filter", body = AppError),
    ),
    tag = "items"
)]
pub async fn list_items(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    Query(params): Query<ListItemsQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = page_window(params.page, params.per_page);
    let filter = params.into_filter()?;

    let service = ItemService::new(db, feed);
    let (items, total) = service.list_items(&filter, page, per_page).await?;
    let items = items.into_iter().map(ItemResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item details", body = ItemResponse),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "items"
)]
pub async fn get_item(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let item = ItemService::new(db, feed).view_item(id).await?;
    Ok(ApiResponse::ok(ItemResponse::from(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{id}/status",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItemStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ItemResponse),
        (status = 400, description = "Unknown status", body = AppError),
        (status = 403, description = "Not the finder or an admin", body = AppError),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "items"
)]
pub async fn update_item_status(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateItemStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let status: ItemStatus = payload.status.parse()?;
    let item = ItemService::new(db, feed)
        .set_status(&actor, id, status)
        .await?;
    Ok(ApiResponse::ok(ItemResponse::from(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 403, description = "Not allowed", body = AppError),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "items"
)]
pub async fn delete_item(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    ItemService::new(db, feed).delete_item(&actor, id).await?;
    Ok(ApiResponse::with_message((), "Item deleted".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/items",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Items the caller found", body = PaginatedResponse<ItemResponse>),
    ),
    tag = "items"
)]
pub async fn list_my_items(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.window();

    let (items, total) = ItemService::new(db, feed)
        .list_by_finder(actor.user_id, page, per_page)
        .await?;
    let items = items.into_iter().map(ItemResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}
