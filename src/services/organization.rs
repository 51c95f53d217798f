use crate::{
    error::{AppError, AppResult},
    events::{ChangeFeed, DomainEvent},
    models::{
        item, organization, organization_admin, verification_request, Item, Organization,
        OrganizationAdmin, OrganizationAdminModel, OrganizationModel, ReviewStatus, User,
        VerificationRequest, VerificationStatus,
    },
    services::access::{can_manage_organization, AccessService, Actor},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};

pub const DEFAULT_ADMIN_ROLE: &str = "admin";
const DEFAULT_RADIUS_METERS: i32 = 500;

/// Details submitted with a self-registration.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub org_type: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_email: String,
    pub contact_phone: String,
    pub logo_url: Option<String>,
    pub radius_meters: Option<i32>,
}

/// Figures shown on an organization's dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationStats {
    pub total_items: u64,
    pub pending_verifications: u64,
    pub admins: u64,
}

pub struct OrganizationService {
    db: DatabaseConnection,
    feed: ChangeFeed,
}

impl OrganizationService {
    pub fn new(db: DatabaseConnection, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    /// New organizations start unverified, inactive and awaiting review.
    pub async fn register(&self, new_org: NewOrganization) -> AppResult<OrganizationModel> {
        if new_org.name.trim().is_empty() || new_org.city.trim().is_empty() {
            return Err(AppError::Validation(
                "name and city are required".to_string(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let model = organization::ActiveModel {
            name: sea_orm::ActiveValue::Set(new_org.name.trim().to_string()),
            org_type: sea_orm::ActiveValue::Set(new_org.org_type.trim().to_string()),
            address: sea_orm::ActiveValue::Set(new_org.address.trim().to_string()),
            city: sea_orm::ActiveValue::Set(new_org.city.trim().to_string()),
            latitude: sea_orm::ActiveValue::Set(new_org.latitude),
            longitude: sea_orm::ActiveValue::Set(new_org.longitude),
            contact_email: sea_orm::ActiveValue::Set(new_org.contact_email.trim().to_string()),
            contact_phone: sea_orm::ActiveValue::Set(new_org.contact_phone.trim().to_string()),
            logo_url: sea_orm::ActiveValue::Set(new_org.logo_url),
            radius_meters: sea_orm::ActiveValue::Set(
                new_org.radius_meters.unwrap_or(DEFAULT_RADIUS_METERS),
            ),
            require_location_verification: sea_orm::ActiveValue::Set(false),
            is_verified: sea_orm::ActiveValue::Set(false),
            is_active: sea_orm::ActiveValue::Set(false),
            review_status: sea_orm::ActiveValue::Set(ReviewStatus::Pending),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        let saved = model.insert(&self.db).await?;
        tracing::info!(organization_id = saved.id, "Organization registered for review");
        self.publish_change(&saved);
        Ok(saved)
    }

    pub async fn approve(&self, organization_id: i32) -> AppResult<OrganizationModel> {
        self.review(organization_id, ReviewStatus::Approved).await
    }

    pub async fn reject(&self, organization_id: i32) -> AppResult<OrganizationModel> {
        self.review(organization_id, ReviewStatus::Rejected).await
    }

    async fn review(
        &self,
        organization_id: i32,
        outcome: ReviewStatus,
    ) -> AppResult<OrganizationModel> {
        let existing = self.get(organization_id).await?;
        let approved = outcome == ReviewStatus::Approved;

        let mut active: organization::ActiveModel = existing.into();
        active.is_verified = sea_orm::ActiveValue::Set(approved);
        active.is_active = sea_orm::ActiveValue::Set(approved);
        active.review_status = sea_orm::ActiveValue::Set(outcome);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;

        tracing::info!(organization_id, "Organization {}", outcome.as_str());
        self.publish_change(&updated);
        Ok(updated)
    }

    pub async fn get(&self, organization_id: i32) -> AppResult<OrganizationModel> {
        Organization::find_by_id(organization_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Active organizations are public; others only to their admins and platform admins.
    pub async fn get_visible(
        &self,
        actor: Option<&Actor>,
        organization_id: i32,
    ) -> AppResult<OrganizationModel> {
        let org = self.get(organization_id).await?;
        let allowed = org.is_active
            || actor.is_some_and(|a| can_manage_organization(a, organization_id));
        if !allowed {
            return Err(AppError::NotFound);
        }
        Ok(org)
    }

    /// Public listing: active organizations by name.
    pub async fn list_active(
        &self,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<OrganizationModel>, u64)> {
        let paginator = Organization::find()
            .filter(organization::Column::IsActive.eq(true))
            .order_by_asc(organization::Column::Name)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let orgs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orgs, total))
    }

    /// Review queue for platform admins.
    pub async fn list_for_review(
        &self,
        review_status: Option<ReviewStatus>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<OrganizationModel>, u64)> {
        let mut query = Organization::find();
        if let Some(status) = review_status {
            query = query.filter(organization::Column::ReviewStatus.eq(status));
        }

        let paginator = query
            .order_by_desc(organization::Column::CreatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let orgs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orgs, total))
    }

    /// Link a user to an organization. The same user may be linked more than once.
    pub async fn assign_admin(
        &self,
        actor: &Actor,
        organization_id: i32,
        user_id: i32,
        role: Option<String>,
    ) -> AppResult<OrganizationAdminModel> {
        if !can_manage_organization(actor, organization_id) {
            return Err(AppError::Forbidden);
        }
        self.get(organization_id).await?;
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::Validation("User not found".to_string()))?;

        if AccessService::new(self.db.clone())
            .is_org_admin(user_id, organization_id)
            .await?
        {
            tracing::debug!(organization_id, user_id, "User already administers this organization");
        }

        let role = role
            .map(|r| r.trim().to_ascii_lowercase())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_ROLE.to_string());

        let saved = organization_admin::ActiveModel {
            organization_id: sea_orm::ActiveValue::Set(organization_id),
            user_id: sea_orm::ActiveValue::Set(user_id),
            role: sea_orm::ActiveValue::Set(role),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::info!(
            organization_id,
            user_id,
            actor = actor.user_id,
            "Organization admin assigned"
        );
        Ok(saved)
    }

    pub async fn list_admins(
        &self,
        actor: &Actor,
        organization_id: i32,
    ) -> AppResult<Vec<OrganizationAdminModel>> {
        if !can_manage_organization(actor, organization_id) {
            return Err(AppError::Forbidden);
        }
        let admins = OrganizationAdmin::find()
            .filter(organization_admin::Column::OrganizationId.eq(organization_id))
            .order_by_asc(organization_admin::Column::Id)
            .all(&self.db)
            .await?;
        Ok(admins)
    }

    pub async fn remove_admin(
        &self,
        actor: &Actor,
        organization_id: i32,
        admin_id: i32,
    ) -> AppResult<()> {
        if !can_manage_organization(actor, organization_id) {
            return Err(AppError::Forbidden);
        }
        let result = OrganizationAdmin::delete_many()
            .filter(organization_admin::Column::Id.eq(admin_id))
            .filter(organization_admin::Column::OrganizationId.eq(organization_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        tracing::info!(organization_id, admin_id, "Organization admin removed");
        Ok(())
    }

    pub async fn stats(&self, actor: &Actor, organization_id: i32) -> AppResult<OrganizationStats> {
        if !can_manage_organization(actor, organization_id) {
            return Err(AppError::Forbidden);
        }
        self.get(organization_id).await?;

        let total_items = Item::find()
            .filter(item::Column::OrganizationId.eq(organization_id))
            .count(&self.db)
            .await?;
        let pending_verifications = VerificationRequest::find()
            .join(JoinType::InnerJoin, verification_request::Relation::Item.def())
            .filter(item::Column::OrganizationId.eq(organization_id))
            .filter(verification_request::Column::Status.eq(VerificationStatus::Pending))
            .count(&self.db)
            .await?;
        let admins = OrganizationAdmin::find()
            .filter(organization_admin::Column::OrganizationId.eq(organization_id))
            .count(&self.db)
            .await?;

        Ok(OrganizationStats {
            total_items,
            pending_verifications,
            admins,
        })
    }

    fn publish_change(&self, org: &OrganizationModel) {
        self.feed.publish(DomainEvent::OrganizationChanged {
            organization_id: org.id,
            review_status: org.review_status,
            is_active: org.is_active,
        });
    }
}
