use crate::{
    error::{AppError, AppResult},
    models::{
        item, profile, verification_request, Item, ItemStatus, Profile, ProfileModel,
        VerificationRequest, VerificationStatus,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

/// Reputation earned per found item that made it back to its owner.
pub const REPUTATION_PER_RETURN: i32 = 10;

/// Profile fields a user may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Aggregates derived from items and verification requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub items_found: i32,
    pub items_claimed: i32,
    pub reputation_score: i32,
}

impl Counters {
    pub fn derive(found: u64, returned: u64, approved_claims: u64) -> Self {
        let clamp = |n: u64| i32::try_from(n).unwrap_or(i32::MAX);
        Self {
            items_found: clamp(found),
            items_claimed: clamp(approved_claims),
            reputation_score: clamp(returned).saturating_mul(REPUTATION_PER_RETURN),
        }
    }
}

pub struct ProfileService {
    db: DatabaseConnection,
}

impl ProfileService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, user_id: i32) -> AppResult<ProfileModel> {
        Profile::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> AppResult<ProfileModel> {
        let existing = self.get_profile(user_id).await?;

        let mut active: profile::ActiveModel = existing.into();
        if let Some(full_name) = update.full_name {
            let full_name = full_name.trim().to_string();
            if full_name.is_empty() {
                return Err(AppError::Validation("full_name cannot be empty".to_string()));
            }
            active.full_name = sea_orm::ActiveValue::Set(full_name);
        }
        if let Some(phone) = update.phone {
            active.phone = sea_orm::ActiveValue::Set(Some(phone.trim().to_string()).filter(|p| !p.is_empty()));
        }
        if let Some(avatar_url) = update.avatar_url {
            active.avatar_url = sea_orm::ActiveValue::Set(Some(avatar_url).filter(|u| !u.is_empty()));
        }
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Recompute a user's counters from the source tables.
    /// Returns `None` when the user has no profile.
    pub async fn recompute_counters(&self, user_id: i32) -> AppResult<Option<ProfileModel>> {
        let Some(existing) = Profile::find_by_id(user_id).one(&self.db).await? else {
            return Ok(None);
        };

        let found = Item::find()
            .filter(item::Column::FinderId.eq(user_id))
            .count(&self.db)
            .await?;
        let returned = Item::find()
            .filter(item::Column::FinderId.eq(user_id))
            .filter(item::Column::Status.eq(ItemStatus::Returned))
            .count(&self.db)
            .await?;
        let approved = VerificationRequest::find()
            .filter(verification_request::Column::ClaimantId.eq(user_id))
            .filter(verification_request::Column::Status.eq(VerificationStatus::Approved))
            .count(&self.db)
            .await?;

        let counters = Counters::derive(found, returned, approved);
        if existing.items_found == counters.items_found
            && existing.items_claimed == counters.items_claimed
            && existing.reputation_score == counters.reputation_score
        {
            return Ok(Some(existing));
        }

        let mut active: profile::ActiveModel = existing.into();
        active.items_found = sea_orm::ActiveValue::Set(counters.items_found);
        active.items_claimed = sea_orm::ActiveValue::Set(counters.items_claimed);
        active.reputation_score = sea_orm::ActiveValue::Set(counters.reputation_score);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;
        Ok(Some(updated))
    }
}
