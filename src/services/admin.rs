use crate::{
    error::{AppError, AppResult},
    models::{
        organization, user, user_role, verification_request, AppRole, Item, Organization,
        ReviewStatus, User, UserModel, UserRole, VerificationRequest, VerificationStatus,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_stats(&self) -> AppResult<AdminStats> {
        let total_items = Item::find().count(&self.db).await?;
        let total_users = User::find().count(&self.db).await?;
        let pending_verifications = VerificationRequest::find()
            .filter(verification_request::Column::Status.eq(VerificationStatus::Pending))
            .count(&self.db)
            .await?;
        let pending_organizations = Organization::find()
            .filter(organization::Column::ReviewStatus.eq(ReviewStatus::Pending))
            .count(&self.db)
            .await?;

        Ok(AdminStats {
            total_items,
            total_users,
            pending_verifications,
            pending_organizations,
        })
    }

    /// Users with their global role, newest first.
    pub async fn list_users(
        &self,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<(UserModel, AppRole)>, u64)> {
        let paginator = User::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;

        let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
        let admin_ids: Vec<i32> = UserRole::find()
            .filter(user_role::Column::UserId.is_in(ids))
            .filter(user_role::Column::Role.eq(AppRole::Admin))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();

        let rows = users
            .into_iter()
            .map(|u| {
                let role = if admin_ids.contains(&u.id) {
                    AppRole::Admin
                } else {
                    AppRole::User
                };
                (u, role)
            })
            .collect();
        Ok((rows, total))
    }

    /// Grant or revoke the platform admin role. An admin cannot demote themself.
    pub async fn set_user_role(
        &self,
        actor_id: i32,
        user_id: i32,
        role: AppRole,
    ) -> AppResult<AppRole> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        match role {
            AppRole::Admin => {
                let has_admin = UserRole::find()
                    .filter(user_role::Column::UserId.eq(user_id))
                    .filter(user_role::Column::Role.eq(AppRole::Admin))
                    .one(&self.db)
                    .await?
                    .is_some();
                if !has_admin {
                    user_role::ActiveModel {
                        user_id: sea_orm::ActiveValue::Set(user_id),
                        role: sea_orm::ActiveValue::Set(AppRole::Admin),
                        created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
                        ..Default::default()
                    }
                    .insert(&self.db)
                    .await?;
                }
            }
            AppRole::User => {
                if actor_id == user_id {
                    return Err(AppError::Validation(
                        "You cannot revoke your own admin role".to_string(),
                    ));
                }
                UserRole::delete_many()
                    .filter(user_role::Column::UserId.eq(user_id))
                    .filter(user_role::Column::Role.eq(AppRole::Admin))
                    .exec(&self.db)
                    .await?;
            }
        }

        tracing::info!(user_id, actor = actor_id, "Global role set to {}", role.as_str());
        Ok(role)
    }
}

pub struct AdminStats {
    pub total_items: u64,
    pub total_users: u64,
    pub pending_verifications: u64,
    pub pending_organizations: u64,
}
