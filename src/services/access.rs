//! Per-request actor context and the authorization rules evaluated against it.

use crate::{
    error::{AppError, AppResult},
    models::{
        organization_admin, user_role, AppRole, ItemModel, OrganizationAdmin, User, UserRole,
        VerificationRequestModel,
    },
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

/// Who is making the request. Resolved once per request by the auth middleware
/// and passed to every authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub global_role: AppRole,
    /// Organizations this user administers.
    pub org_admin_of: Vec<i32>,
}

impl Actor {
    pub fn is_global_admin(&self) -> bool {
        self.global_role == AppRole::Admin
    }

    pub fn is_org_admin(&self, organization_id: i32) -> bool {
        self.org_admin_of.contains(&organization_id)
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if can_view_admin_console(self) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Finder of the item, an admin of the item's organization, or a platform admin.
pub fn can_adjudicate(actor: &Actor, item: &ItemModel) -> bool {
    item.finder_id == actor.user_id
        || item
            .organization_id
            .is_some_and(|org_id| actor.is_org_admin(org_id))
        || actor.is_global_admin()
}

/// Status changes are open to the same set of actors as adjudication.
pub fn can_manage_item(actor: &Actor, item: &ItemModel) -> bool {
    can_adjudicate(actor, item)
}

/// Hard delete is an admin action. Finders cannot remove their own listings,
/// since that would also drop the claims made against them.
pub fn can_delete_item(actor: &Actor, item: &ItemModel) -> bool {
    actor.is_global_admin()
        || item
            .organization_id
            .is_some_and(|org_id| actor.is_org_admin(org_id))
}

pub fn can_view_request(actor: &Actor, request: &VerificationRequestModel, item: &ItemModel) -> bool {
    request.claimant_id == actor.user_id || can_adjudicate(actor, item)
}

pub fn can_view_admin_console(actor: &Actor) -> bool {
    actor.is_global_admin()
}

pub fn can_manage_organization(actor: &Actor, organization_id: i32) -> bool {
    actor.is_org_admin(organization_id) || actor.is_global_admin()
}

/// Server-side role lookups backing the rules above.
pub struct AccessService {
    db: DatabaseConnection,
}

impl AccessService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn has_role(&self, user_id: i32, role: AppRole) -> AppResult<bool> {
        let count = UserRole::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .filter(user_role::Column::Role.eq(role))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn is_org_admin(&self, user_id: i32, organization_id: i32) -> AppResult<bool> {
        let count = OrganizationAdmin::find()
            .filter(organization_admin::Column::UserId.eq(user_id))
            .filter(organization_admin::Column::OrganizationId.eq(organization_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Build the actor for an authenticated user id. Unknown users are unauthorized.
    pub async fn load_actor(&self, user_id: i32) -> AppResult<Actor> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let global_role = if self.has_role(user_id, AppRole::Admin).await? {
            AppRole::Admin
        } else {
            AppRole::User
        };

        let mut org_admin_of: Vec<i32> = OrganizationAdmin::find()
            .filter(organization_admin::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.organization_id)
            .collect();
        org_admin_of.sort_unstable();
        org_admin_of.dedup();

        Ok(Actor {
            user_id,
            global_role,
            org_admin_of,
        })
    }
}
