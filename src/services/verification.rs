//! Claim submission and adjudication.

use crate::{
    error::{AppError, AppResult},
    events::{ChangeFeed, DomainEvent},
    models::{
        item, verification_request, Decision, Item, ItemModel, ItemStatus, Profile,
        SecurityAnswers, VerificationRequest, VerificationRequestModel, VerificationStatus,
    },
    services::{
        access::{can_adjudicate, can_manage_organization, can_view_request, Actor},
        sms::{SmsDispatcher, SmsRequest},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select, SelectTwo, TransactionTrait,
};
use std::sync::Arc;

/// A verification request together with the item it refers to.
pub type ClaimWithItem = (VerificationRequestModel, Option<ItemModel>);

/// Proof of ownership supplied by the claimant. Stored as given.
#[derive(Debug, Clone, Default)]
pub struct ClaimProof {
    pub purchase_proof_url: Option<String>,
    pub identification_marks: Option<String>,
    pub photo_with_item_urls: Vec<String>,
    pub additional_proof_urls: Vec<String>,
    pub security_answers: Option<SecurityAnswers>,
    pub claimant_phone: Option<String>,
}

pub struct VerificationService {
    db: DatabaseConnection,
    feed: ChangeFeed,
    sms: Option<Arc<dyn SmsDispatcher>>,
}

impl VerificationService {
    pub fn new(db: DatabaseConnection, feed: ChangeFeed) -> Self {
        Self {
            db,
            feed,
            sms: None,
        }
    }

    pub fn with_notifier(mut self, sms: Arc<dyn SmsDispatcher>) -> Self {
        self.sms = Some(sms);
        self
    }

    /// Load the item and make sure it still accepts claims.
    pub async fn claimable_item(&self, item_id: i32) -> AppResult<ItemModel> {
        let item = Item::find_by_id(item_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        if !item.status.is_claimable() {
            return Err(AppError::ItemNotClaimable(format!(
                "Item is {} and no longer accepts claims",
                item.status.as_str()
            )));
        }
        Ok(item)
    }

    pub async fn submit_request(
        &self,
        claimant_id: i32,
        item_id: i32,
        proof: ClaimProof,
    ) -> AppResult<VerificationRequestModel> {
        let item = self.claimable_item(item_id).await?;

        let now = chrono::Utc::now().naive_utc();
        let model = verification_request::ActiveModel {
            item_id: sea_orm::ActiveValue::Set(item.id),
            claimant_id: sea_orm::ActiveValue::Set(claimant_id),
            purchase_proof_url: sea_orm::ActiveValue::Set(proof.purchase_proof_url),
            identification_marks: sea_orm::ActiveValue::Set(proof.identification_marks),
            photo_with_item_urls: sea_orm::ActiveValue::Set(proof.photo_with_item_urls),
            additional_proof_urls: sea_orm::ActiveValue::Set(proof.additional_proof_urls),
            security_answers: sea_orm::ActiveValue::Set(
                proof.security_answers.filter(|a| !a.is_empty()),
            ),
            claimant_phone: sea_orm::ActiveValue::Set(proof.claimant_phone),
            admin_notes: sea_orm::ActiveValue::Set(None),
            status: sea_orm::ActiveValue::Set(VerificationStatus::Pending),
            decided_by: sea_orm::ActiveValue::Set(None),
            decided_at: sea_orm::ActiveValue::Set(None),
            sms_sent: sea_orm::ActiveValue::Set(false),
            sms_sent_at: sea_orm::ActiveValue::Set(None),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        let saved = model.insert(&self.db).await?;
        tracing::info!(
            request_id = saved.id,
            item_id,
            claimant_id,
            "Verification request submitted"
        );

        self.feed.publish(DomainEvent::VerificationSubmitted {
            request_id: saved.id,
            item_id,
            claimant_id,
            finder_id: item.finder_id,
            organization_id: item.organization_id,
        });
        Ok(saved)
    }

    /// A single request, visible to its claimant and to the item's adjudicators.
    pub async fn get_request(&self, actor: &Actor, request_id: i32) -> AppResult<ClaimWithItem> {
        let (request, item) = self.load(request_id).await?;
        if !can_view_request(actor, &request, &item) {
            return Err(AppError::Forbidden);
        }
        Ok((request, Some(item)))
    }

    pub async fn list_for_item(
        &self,
        actor: &Actor,
        item_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ClaimWithItem>, u64)> {
        let item = Item::find_by_id(item_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        if !can_adjudicate(actor, &item) {
            return Err(AppError::Forbidden);
        }

        let query = with_item(
            VerificationRequest::find().filter(verification_request::Column::ItemId.eq(item_id)),
        );
        self.paginate(query, page, per_page).await
    }

    pub async fn list_by_claimant(
        &self,
        claimant_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ClaimWithItem>, u64)> {
        let query = with_item(
            VerificationRequest::find()
                .filter(verification_request::Column::ClaimantId.eq(claimant_id)),
        );
        self.paginate(query, page, per_page).await
    }

    /// Requests against items the given user found.
    pub async fn list_for_finder(
        &self,
        finder_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ClaimWithItem>, u64)> {
        let query = with_item(VerificationRequest::find())
            .filter(item::Column::FinderId.eq(finder_id));
        self.paginate(query, page, per_page).await
    }

    pub async fn list_for_organization(
        &self,
        actor: &Actor,
        organization_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ClaimWithItem>, u64)> {
        if !can_manage_organization(actor, organization_id) {
            return Err(AppError::Forbidden);
        }
        let query = with_item(VerificationRequest::find())
            .filter(item::Column::OrganizationId.eq(organization_id));
        self.paginate(query, page, per_page).await
    }

    /// Every request on the platform, optionally by status. Admin console only.
    pub async fn list_all(
        &self,
        status: Option<VerificationStatus>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ClaimWithItem>, u64)> {
        let mut query = VerificationRequest::find();
        if let Some(status) = status {
            query = query.filter(verification_request::Column::Status.eq(status));
        }
        self.paginate(with_item(query), page, per_page).await
    }

    /// Approve or reject a pending request.
    ///
    /// The status change is a conditional update on `status = 'pending'`, so of
    /// two concurrent deciders exactly one wins. Approval also moves the item to
    /// `returned` in the same transaction and fails if it already was.
    pub async fn decide(
        &self,
        actor: &Actor,
        request_id: i32,
        decision: Decision,
        notes: Option<String>,
    ) -> AppResult<VerificationRequestModel> {
        let (request, item) = self.load(request_id).await?;
        if !can_adjudicate(actor, &item) {
            return Err(AppError::Forbidden);
        }
        if request.status.is_terminal() {
            return Err(already_decided(request.status));
        }

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let result = VerificationRequest::update_many()
            .set(verification_request::ActiveModel {
                status: sea_orm::ActiveValue::Set(decision.as_status()),
                admin_notes: sea_orm::ActiveValue::Set(notes),
                decided_by: sea_orm::ActiveValue::Set(Some(actor.user_id)),
                decided_at: sea_orm::ActiveValue::Set(Some(now)),
                updated_at: sea_orm::ActiveValue::Set(now),
                ..Default::default()
            })
            .filter(verification_request::Column::Id.eq(request_id))
            .filter(verification_request::Column::Status.eq(VerificationStatus::Pending))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::InvalidState(
                "Verification request has already been decided".to_string(),
            ));
        }

        if let Some(target) = decision.item_transition() {
            let moved = Item::update_many()
                .set(item::ActiveModel {
                    status: sea_orm::ActiveValue::Set(target),
                    updated_at: sea_orm::ActiveValue::Set(now),
                    ..Default::default()
                })
                .filter(item::Column::Id.eq(item.id))
                .filter(item::Column::Status.ne(ItemStatus::Returned))
                .exec(&txn)
                .await?;
            if moved.rows_affected == 0 {
                txn.rollback().await?;
                return Err(AppError::InvalidState(
                    "Item has already been returned to another claimant".to_string(),
                ));
            }
        }

        txn.commit().await?;

        let decided = VerificationRequest::find_by_id(request_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::info!(
            request_id,
            item_id = item.id,
            actor = actor.user_id,
            "Verification request {}",
            decided.status.as_str()
        );

        self.feed.publish(DomainEvent::VerificationDecided {
            request_id,
            item_id: item.id,
            claimant_id: decided.claimant_id,
            finder_id: item.finder_id,
            organization_id: item.organization_id,
            status: decided.status,
        });
        if let Some(target) = decision.item_transition() {
            self.feed.publish(DomainEvent::ItemStatusChanged {
                item_id: item.id,
                finder_id: item.finder_id,
                organization_id: item.organization_id,
                status: target,
            });
        }

        self.notify_claimant(&decided, &item.title, decision).await;
        Ok(decided)
    }

    /// Fire the decision SMS on a background task. Never fails the caller.
    async fn notify_claimant(
        &self,
        request: &VerificationRequestModel,
        item_title: &str,
        decision: Decision,
    ) {
        let Some(sms) = self.sms.clone() else {
            tracing::debug!(request_id = request.id, "No SMS dispatcher, skipping notification");
            return;
        };

        let phone = match request.claimant_phone.clone().filter(|p| !p.trim().is_empty()) {
            Some(phone) => Some(phone),
            None => match Profile::find_by_id(request.claimant_id).one(&self.db).await {
                Ok(profile) => profile.and_then(|p| p.phone).filter(|p| !p.trim().is_empty()),
                Err(e) => {
                    tracing::warn!("Failed to look up claimant phone: {}", e);
                    None
                }
            },
        };
        let Some(phone) = phone else {
            tracing::debug!(request_id = request.id, "Claimant has no phone, skipping SMS");
            return;
        };

        let db = self.db.clone();
        let request_id = request.id;
        let sms_request = SmsRequest {
            phone,
            item_title: item_title.to_string(),
            status: decision,
        };

        tokio::spawn(async move {
            let response = sms.send(sms_request).await;
            if !response.success {
                tracing::warn!(request_id, "Decision SMS was not delivered");
                return;
            }
            let now = chrono::Utc::now().naive_utc();
            let recorded = VerificationRequest::update_many()
                .set(verification_request::ActiveModel {
                    sms_sent: sea_orm::ActiveValue::Set(true),
                    sms_sent_at: sea_orm::ActiveValue::Set(Some(now)),
                    ..Default::default()
                })
                .filter(verification_request::Column::Id.eq(request_id))
                .exec(&db)
                .await;
            if let Err(e) = recorded {
                tracing::warn!(request_id, "Failed to record SMS delivery: {}", e);
            }
        });
    }

    async fn load(&self, request_id: i32) -> AppResult<(VerificationRequestModel, ItemModel)> {
        let (request, item) = VerificationRequest::find_by_id(request_id)
            .find_also_related(Item)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let item = item.ok_or(AppError::NotFound)?;
        Ok((request, item))
    }

    async fn paginate(
        &self,
        query: SelectTwo<VerificationRequest, Item>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ClaimWithItem>, u64)> {
        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}

fn with_item(query: Select<VerificationRequest>) -> SelectTwo<VerificationRequest, Item> {
    query
        .find_also_related(Item)
        .order_by_desc(verification_request::Column::CreatedAt)
        .order_by_desc(verification_request::Column::Id)
}

fn already_decided(status: VerificationStatus) -> AppError {
    AppError::InvalidState(format!(
        "Verification request was already {}",
        status.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_decided_names_status() {
        match already_decided(VerificationStatus::Rejected) {
            AppError::InvalidState(msg) => assert!(msg.ends_with("rejected")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn default_proof_is_empty() {
        let proof = ClaimProof::default();
        assert!(proof.photo_with_item_urls.is_empty());
        assert!(proof.security_answers.is_none());
    }
}
