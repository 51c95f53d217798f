use crate::error::{AppError, AppResult};
use crate::events::ChangeFeed;
use crate::models::{
    Decision, ItemModel, ItemStatus, SecurityAnswers, VerificationRequestModel,
    VerificationStatus,
};
use crate::response::{page_window, ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::access::Actor;
use crate::services::sms::SharedSms;
use crate::services::upload::{PendingFile, SharedStorage, UploadService, PROOFS_DIR};
use crate::services::verification::{ClaimProof, ClaimWithItem, VerificationService};
use axum::{
    extract::{Multipart, Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitClaimRequest {
    /// Receipt or invoice image URL
    #[validate(length(max = 500))]
    pub purchase_proof_url: Option<String>,
    /// Marks only the owner would know about
    #[validate(length(max = 2000))]
    pub identification_marks: Option<String>,
    /// Photos of the claimant with the item
    #[serde(default)]
    #[validate(length(max = 10))]
    pub photo_with_item_urls: Vec<String>,
    /// Any other supporting documents
    #[serde(default)]
    #[validate(length(max = 10))]
    pub additional_proof_urls: Vec<String>,
    /// Answers to the ownership questions
    pub security_answers: Option<SecurityAnswers>,
    /// Phone number for the decision SMS
    #[validate(length(max = 20))]
    pub claimant_phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DecideClaimRequest {
    /// approved or rejected
    pub decision: String,
    /// Notes recorded with the decision
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListClaimsQuery {
    /// Filter by status
    pub status: Option<String>,
    /// Page number
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimItemSummary {
    pub id: i32,
    pub title: String,
    pub status: ItemStatus,
    pub image_urls: Vec<String>,
}

impl From<ItemModel> for ClaimItemSummary {
    fn from(i: ItemModel) -> Self {
        Self {
            id: i.id,
            title: i.title,
            status: i.status,
            image_urls: i.image_urls,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimResponse {
    pub id: i32,
    pub item_id: i32,
    pub claimant_id: i32,
    pub purchase_proof_url: Option<String>,
    pub identification_marks: Option<String>,
    pub photo_with_item_urls: Vec<String>,
    pub additional_proof_urls: Vec<String>,
    pub security_answers: Option<SecurityAnswers>,
    pub claimant_phone: Option<String>,
    pub admin_notes: Option<String>,
    pub status: VerificationStatus,
    pub decided_by: Option<i32>,
    pub decided_at: Option<String>,
    pub sms_sent: bool,
    pub sms_sent_at: Option<String>,
    pub created_at: String,
    /// The claimed item, when loaded
    pub item: Option<ClaimItemSummary>,
}

impl From<VerificationRequestModel> for ClaimResponse {
    fn from(r: VerificationRequestModel) -> Self {
        Self {
            id: r.id,
            item_id: r.item_id,
            claimant_id: r.claimant_id,
            purchase_proof_url: r.purchase_proof_url,
            identification_marks: r.identification_marks,
            photo_with_item_urls: r.photo_with_item_urls,
            additional_proof_urls: r.additional_proof_urls,
            security_answers: r.security_answers,
            claimant_phone: r.claimant_phone,
            admin_notes: r.admin_notes,
            status: r.status,
            decided_by: r.decided_by,
            decided_at: r.decided_at.map(|t| t.to_string()),
            sms_sent: r.sms_sent,
            sms_sent_at: r.sms_sent_at.map(|t| t.to_string()),
            created_at: r.created_at.to_string(),
            item: None,
        }
    }
}

impl From<ClaimWithItem> for ClaimResponse {
    fn from((request, item): ClaimWithItem) -> Self {
        Self {
            item: item.map(ClaimItemSummary::from),
            ..Self::from(request)
        }
    }
}

fn paginated(
    rows: Vec<ClaimWithItem>,
    total: u64,
    page: u64,
    per_page: u64,
) -> PaginatedResponse<ClaimResponse> {
    let items = rows.into_iter().map(ClaimResponse::from).collect();
    PaginatedResponse::new(items, total, page, per_page)
}

#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/claims",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body = SubmitClaimRequest,
    responses(
        (status = 200, description = "Claim submitted", body = ClaimResponse),
        (status = 404, description = "Item not found", body = AppError),
        (status = 409, description = "Item not claimable", body = AppError),
    ),
    tag = "claims"
)]
pub async fn submit_claim(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(item_id): Path<i32>,
    Json(payload): Json<SubmitClaimRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = VerificationService::new(db, feed);
    let request = service
        .submit_request(
            actor.user_id,
            item_id,
            ClaimProof {
                purchase_proof_url: payload.purchase_proof_url,
                identification_marks: payload.identification_marks,
                photo_with_item_urls: payload.photo_with_item_urls,
                additional_proof_urls: payload.additional_proof_urls,
                security_answers: payload.security_answers,
                claimant_phone: payload.claimant_phone,
            },
        )
        .await?;

    Ok(ApiResponse::ok(ClaimResponse::from(request)))
}

/// Proof files and text fields read from a multipart claim form.
#[derive(Default)]
struct ClaimForm {
    purchase_proof: Option<PendingFile>,
    photos_with_item: Vec<PendingFile>,
    additional_proofs: Vec<PendingFile>,
    identification_marks: Option<String>,
    claimant_phone: Option<String>,
    answers: SecurityAnswers,
}

impl ClaimForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "purchase_proof" | "photo_with_item" | "additional_proof" => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read file data: {}", e))
                    })?;
                    let file = PendingFile {
                        content_type,
                        data: data.to_vec(),
                    };
                    match name.as_str() {
                        "purchase_proof" => form.purchase_proof = Some(file),
                        "photo_with_item" => form.photos_with_item.push(file),
                        _ => form.additional_proofs.push(file),
                    }
                }
                _ => {
                    let value = field.text().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read field {}: {}", name, e))
                    })?;
                    let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                    match name.as_str() {
                        "identification_marks" => form.identification_marks = value,
                        "claimant_phone" => form.claimant_phone = value,
                        "purchase_date" => form.answers.purchase_date = value,
                        "purchase_location" => form.answers.purchase_location = value,
                        "specific_details" => form.answers.specific_details = value,
                        _ => tracing::debug!("Ignoring unknown claim form field {}", name),
                    }
                }
            }
        }
        Ok(form)
    }

    /// Move every file out of the form as one batch: purchase proof first,
    /// then photos, then additional proofs. Returns the batch and the group sizes.
    fn take_files(&mut self) -> (Vec<PendingFile>, FileGroups) {
        let groups = FileGroups {
            has_purchase_proof: self.purchase_proof.is_some(),
            photos: self.photos_with_item.len(),
        };
        let mut files = Vec::with_capacity(
            usize::from(groups.has_purchase_proof)
                + self.photos_with_item.len()
                + self.additional_proofs.len(),
        );
        files.extend(self.purchase_proof.take());
        files.append(&mut self.photos_with_item);
        files.append(&mut self.additional_proofs);
        (files, groups)
    }
}

struct FileGroups {
    has_purchase_proof: bool,
    photos: usize,
}

impl FileGroups {
    /// Split stored URLs back into (purchase proof, photos, additional proofs).
    fn split(&self, urls: Vec<String>) -> (Option<String>, Vec<String>, Vec<String>) {
        let mut urls = urls.into_iter();
        let purchase_proof = if self.has_purchase_proof {
            urls.next()
        } else {
            None
        };
        let photos = urls.by_ref().take(self.photos).collect();
        (purchase_proof, photos, urls.collect())
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/claims/upload",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body(content_type = "multipart/form-data", description = "Files: purchase_proof, photo_with_item (repeatable), additional_proof (repeatable). Text: identification_marks, claimant_phone, purchase_date, purchase_location, specific_details"),
    responses(
        (status = 200, description = "Claim submitted", body = ClaimResponse),
        (status = 409, description = "Item not claimable", body = AppError),
        (status = 502, description = "File upload failed, nothing saved", body = AppError),
    ),
    tag = "claims"
)]
pub async fn submit_claim_with_files(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    Extension(storage): Extension<SharedStorage>,
    actor: Actor,
    Path(item_id): Path<i32>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = ClaimForm::read(multipart).await?;
    let service = VerificationService::new(db, feed);

    // Refuse early so nothing is uploaded for an item that cannot be claimed.
    service.claimable_item(item_id).await?;

    // One batch: every file is validated before any is stored, and every file
    // is stored before the request row is written.
    let (files, groups) = form.take_files();
    let urls = UploadService::save_all(storage.as_ref(), &files, PROOFS_DIR).await?;
    let (purchase_proof_url, photo_with_item_urls, additional_proof_urls) = groups.split(urls);

    let request = service
        .submit_request(
            actor.user_id,
            item_id,
            ClaimProof {
                purchase_proof_url,
                identification_marks: form.identification_marks,
                photo_with_item_urls,
                additional_proof_urls,
                security_answers: Some(form.answers),
                claimant_phone: form.claimant_phone,
            },
        )
        .await?;

    Ok(ApiResponse::ok(ClaimResponse::from(request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}/claims",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Item ID"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Claims on the item", body = PaginatedResponse<ClaimResponse>),
        (status = 403, description = "Not an adjudicator of this item", body = AppError),
    ),
    tag = "claims"
)]
pub async fn list_item_claims(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(item_id): Path<i32>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.window();

    let (rows, total) = VerificationService::new(db, feed)
        .list_for_item(&actor, item_id, page, per_page)
        .await?;
    Ok(ApiResponse::ok(paginated(rows, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/claims",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Claims the caller submitted", body = PaginatedResponse<ClaimResponse>),
    ),
    tag = "claims"
)]
pub async fn list_my_claims(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.window();

    let (rows, total) = VerificationService::new(db, feed)
        .list_by_claimant(actor.user_id, page, per_page)
        .await?;
    Ok(ApiResponse::ok(paginated(rows, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/finds/claims",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Claims on items the caller found", body = PaginatedResponse<ClaimResponse>),
    ),
    tag = "claims"
)]
pub async fn list_claims_on_my_finds(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.window();

    let (rows, total) = VerificationService::new(db, feed)
        .list_for_finder(actor.user_id, page, per_page)
        .await?;
    Ok(ApiResponse::ok(paginated(rows, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}/claims",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Organization ID"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Claims on the organization's items", body = PaginatedResponse<ClaimResponse>),
        (status = 403, description = "Not an admin of this organization", body = AppError),
    ),
    tag = "claims"
)]
pub async fn list_organization_claims(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(organization_id): Path<i32>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.window();

    let (rows, total) = VerificationService::new(db, feed)
        .list_for_organization(&actor, organization_id, page, per_page)
        .await?;
    Ok(ApiResponse::ok(paginated(rows, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/claims/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Verification request ID")),
    responses(
        (status = 200, description = "The claim", body = ClaimResponse),
        (status = 403, description = "Not the claimant or an adjudicator", body = AppError),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "claims"
)]
pub async fn get_claim(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let row = VerificationService::new(db, feed)
        .get_request(&actor, id)
        .await?;
    Ok(ApiResponse::ok(ClaimResponse::from(row)))
}

#[utoipa::path(
    put,
    path = "/api/v1/claims/{id}/decision",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Verification request ID")),
    request_body = DecideClaimRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ClaimResponse),
        (status = 400, description = "Unknown decision", body = AppError),
        (status = 403, description = "Not an adjudicator of this item", body = AppError),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Already decided", body = AppError),
    ),
    tag = "claims"
)]
pub async fn decide_claim(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    Extension(sms): Extension<SharedSms>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<DecideClaimRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let decision: Decision = payload.decision.parse()?;
    let notes = payload
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let request = VerificationService::new(db, feed)
        .with_notifier(sms)
        .decide(&actor, id, decision, notes)
        .await?;

    Ok(ApiResponse::ok(ClaimResponse::from(request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/claims",
    security(("jwt_token" = [])),
    params(
        ("status" = Option<String>, Query, description = "pending, approved or rejected"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "All claims", body = PaginatedResponse<ClaimResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn admin_list_claims(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
    actor: Actor,
    Query(params): Query<ListClaimsQuery>,
) -> AppResult<impl IntoResponse> {
    actor.require_admin()?;

    let status = match params.status.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<VerificationStatus>()?),
        _ => None,
    };
    let (page, per_page) = page_window(params.page, params.per_page);

    let (rows, total) = VerificationService::new(db, feed)
        .list_all(status, page, per_page)
        .await?;
    Ok(ApiResponse::ok(paginated(rows, total, page, per_page)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(tag: u8) -> PendingFile {
        PendingFile {
            content_type: "image/png".to_string(),
            data: vec![tag],
        }
    }

    #[test]
    fn batch_keeps_group_order() {
        let mut form = ClaimForm {
            purchase_proof: Some(file(0)),
            photos_with_item: vec![file(1), file(2)],
            additional_proofs: vec![file(3)],
            ..Default::default()
        };
        let (files, groups) = form.take_files();
        let tags: Vec<u8> = files.iter().map(|f| f.data[0]).collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
        assert!(form.purchase_proof.is_none());

        let urls = tags.iter().map(|t| format!("/uploads/proofs/{}.png", t)).collect();
        let (proof, photos, extra) = groups.split(urls);
        assert_eq!(proof.as_deref(), Some("/uploads/proofs/0.png"));
        assert_eq!(photos, vec!["/uploads/proofs/1.png", "/uploads/proofs/2.png"]);
        assert_eq!(extra, vec!["/uploads/proofs/3.png"]);
    }

    #[test]
    fn split_without_purchase_proof() {
        let mut form = ClaimForm {
            additional_proofs: vec![file(7)],
            ..Default::default()
        };
        let (files, groups) = form.take_files();
        assert_eq!(files.len(), 1);
        let (proof, photos, extra) = groups.split(vec!["a".to_string()]);
        assert!(proof.is_none());
        assert!(photos.is_empty());
        assert_eq!(extra, vec!["a"]);
    }
}
