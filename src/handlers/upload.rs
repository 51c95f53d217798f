use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::services::access::Actor;
use crate::services::upload::{SharedStorage, UploadService, ITEMS_DIR};
use axum::{extract::Multipart, response::IntoResponse, Extension};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

/// Upload an item photo.
#[utoipa::path(
    post,
    path = "/api/v1/upload/image",
    security(("jwt_token" = [])),
    request_body(content_type = "multipart/form-data", description = "Image in field \"file\""),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Not an accepted image", body = AppError),
        (status = 413, description = "File too large", body = AppError),
    ),
    tag = "uploads"
)]
pub async fn upload_image(
    Extension(storage): Extension<SharedStorage>,
    actor: Actor,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let field = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
            .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
        if field.name() == Some("file") {
            break field;
        }
    };

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;

    let url = UploadService::save_image(storage.as_ref(), &data, &content_type, ITEMS_DIR).await?;
    tracing::debug!(user_id = actor.user_id, "Image uploaded to {}", url);

    Ok(ApiResponse::ok(UploadResponse { url }))
}
