use crate::{
    error::{AppError, AppResult},
    events::{ChangeFeed, DomainEvent},
    models::{
        item, verification_request, Item, ItemCategory, ItemModel, ItemStatus, Organization,
        VerificationRequest,
    },
    services::access::{can_delete_item, can_manage_item, Actor},
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Fields supplied by the finder when posting an item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub city: String,
    pub area: String,
    pub specific_location: String,
    pub date_found: NaiveDate,
    pub image_urls: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub organization_id: Option<i32>,
    pub contact_method: Option<String>,
}

impl NewItem {
    fn check_required(&self) -> AppResult<()> {
        let required = [
            ("title", &self.title),
            ("city", &self.city),
            ("area", &self.area),
            ("specific_location", &self.specific_location),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    return Err(AppError::Validation(
                        "Coordinates are out of range".to_string(),
                    ));
                }
            }
            (None, None) => {}
            _ => {
                return Err(AppError::Validation(
                    "latitude and longitude must be given together".to_string(),
                ))
            }
        }
        Ok(())
    }
}

/// Search criteria for the public listing.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Case-insensitive substring of title or description.
    pub text: Option<String>,
    pub category: Option<ItemCategory>,
    /// Exact city match.
    pub city: Option<String>,
    /// Lower bound on creation time.
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub organization_id: Option<i32>,
    pub status: Option<ItemStatus>,
}

impl ItemFilter {
    /// Blank strings count as "no filter".
    pub fn normalized(mut self) -> Self {
        self.text = self.text.and_then(non_blank);
        self.city = self.city.and_then(non_blank);
        self
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(text) = &self.text {
            let pattern = like_pattern(text);
            cond = cond.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(item::Column::Title))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(item::Column::Description))).like(pattern)),
            );
        }
        if let Some(category) = self.category {
            cond = cond.add(item::Column::Category.eq(category));
        }
        if let Some(city) = &self.city {
            cond = cond.add(item::Column::City.eq(city.as_str()));
        }
        if let Some(since) = self.since {
            cond = cond.add(item::Column::CreatedAt.gte(since));
        }
        if let Some(until) = self.until {
            cond = cond.add(item::Column::CreatedAt.lte(until));
        }
        if let Some(org_id) = self.organization_id {
            cond = cond.add(item::Column::OrganizationId.eq(org_id));
        }
        if let Some(status) = self.status {
            cond = cond.add(item::Column::Status.eq(status));
        }
        cond
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lowercased `%text%` pattern with LIKE wildcards escaped.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub struct ItemService {
    db: DatabaseConnection,
    feed: ChangeFeed,
}

impl ItemService {
    pub fn new(db: DatabaseConnection, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub async fn create_item(
        &self,
        finder_id: i32,
        new_item: NewItem,
        ttl: chrono::Duration,
    ) -> AppResult<ItemModel> {
        new_item.check_required()?;

        if let Some(org_id) = new_item.organization_id {
            let org = Organization::find_by_id(org_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| AppError::Validation("Organization not found".to_string()))?;
            if !org.is_active {
                return Err(AppError::Validation(
                    "Organization is not active".to_string(),
                ));
            }
        }

        let now = chrono::Utc::now().naive_utc();
        let model = item::ActiveModel {
            finder_id: sea_orm::ActiveValue::Set(finder_id),
            organization_id: sea_orm::ActiveValue::Set(new_item.organization_id),
            title: sea_orm::ActiveValue::Set(new_item.title.trim().to_string()),
            description: sea_orm::ActiveValue::Set(new_item.description.trim().to_string()),
            category: sea_orm::ActiveValue::Set(new_item.category),
            city: sea_orm::ActiveValue::Set(new_item.city.trim().to_string()),
            area: sea_orm::ActiveValue::Set(new_item.area.trim().to_string()),
            specific_location: sea_orm::ActiveValue::Set(
                new_item.specific_location.trim().to_string(),
            ),
            date_found: sea_orm::ActiveValue::Set(new_item.date_found),
            image_urls: sea_orm::ActiveValue::Set(new_item.image_urls),
            latitude: sea_orm::ActiveValue::Set(new_item.latitude),
            longitude: sea_orm::ActiveValue::Set(new_item.longitude),
            contact_method: sea_orm::ActiveValue::Set(new_item.contact_method),
            status: sea_orm::ActiveValue::Set(ItemStatus::Available),
            views: sea_orm::ActiveValue::Set(0),
            expires_at: sea_orm::ActiveValue::Set(now + ttl),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        let saved = model.insert(&self.db).await?;
        tracing::info!(item_id = saved.id, finder_id, "Item posted");

        self.feed.publish(DomainEvent::ItemCreated {
            item_id: saved.id,
            finder_id: saved.finder_id,
            organization_id: saved.organization_id,
        });
        Ok(saved)
    }

    pub async fn get_item(&self, item_id: i32) -> AppResult<ItemModel> {
        Item::find_by_id(item_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Fetch an item for display, counting the view.
    pub async fn view_item(&self, item_id: i32) -> AppResult<ItemModel> {
        let result = Item::update_many()
            .col_expr(item::Column::Views, Expr::col(item::Column::Views).add(1))
            .filter(item::Column::Id.eq(item_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        self.get_item(item_id).await
    }

    pub async fn list_items(
        &self,
        filter: &ItemFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ItemModel>, u64)> {
        let paginator = Item::find()
            .filter(filter.condition())
            .order_by_desc(item::Column::CreatedAt)
            .order_by_desc(item::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub async fn list_by_finder(
        &self,
        finder_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ItemModel>, u64)> {
        let paginator = Item::find()
            .filter(item::Column::FinderId.eq(finder_id))
            .order_by_desc(item::Column::CreatedAt)
            .order_by_desc(item::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Overwrite the item status. Any status may follow any other.
    pub async fn set_status(
        &self,
        actor: &Actor,
        item_id: i32,
        status: ItemStatus,
    ) -> AppResult<ItemModel> {
        let existing = self.get_item(item_id).await?;
        if !can_manage_item(actor, &existing) {
            return Err(AppError::Forbidden);
        }

        let previous = existing.status;
        let mut active: item::ActiveModel = existing.into();
        active.status = sea_orm::ActiveValue::Set(status);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;

        tracing::info!(
            item_id,
            actor = actor.user_id,
            "Item status {} -> {}",
            previous.as_str(),
            status.as_str()
        );
        self.feed.publish(DomainEvent::ItemStatusChanged {
            item_id,
            finder_id: updated.finder_id,
            organization_id: updated.organization_id,
            status,
        });
        Ok(updated)
    }

    /// Hard delete. Verification requests go with it through the foreign key.
    pub async fn delete_item(&self, actor: &Actor, item_id: i32) -> AppResult<()> {
        let existing = self.get_item(item_id).await?;
        if !can_delete_item(actor, &existing) {
            return Err(AppError::Forbidden);
        }

        let claimant_ids = self.claimants_of(item_id).await?;
        Item::delete_by_id(item_id).exec(&self.db).await?;
        tracing::info!(item_id, actor = actor.user_id, "Item deleted");

        self.feed.publish(DomainEvent::ItemDeleted {
            item_id,
            finder_id: existing.finder_id,
            organization_id: existing.organization_id,
            claimant_ids,
        });
        Ok(())
    }

    /// Remove items whose listing period has ended. Returns how many were removed.
    pub async fn delete_expired(&self, now: NaiveDateTime) -> AppResult<u64> {
        let expired = Item::find()
            .filter(item::Column::ExpiresAt.lt(now))
            .all(&self.db)
            .await?;
        if expired.is_empty() {
            tracing::debug!("No expired items");
            return Ok(0);
        }

        let mut events = Vec::with_capacity(expired.len());
        for it in &expired {
            events.push(DomainEvent::ItemDeleted {
                item_id: it.id,
                finder_id: it.finder_id,
                organization_id: it.organization_id,
                claimant_ids: self.claimants_of(it.id).await?,
            });
        }

        let ids: Vec<i32> = expired.iter().map(|it| it.id).collect();
        let result = Item::delete_many()
            .filter(item::Column::Id.is_in(ids))
            .exec(&self.db)
            .await?;

        tracing::info!(count = result.rows_affected, "Expired items removed");
        for event in events {
            self.feed.publish(event);
        }
        Ok(result.rows_affected)
    }

    async fn claimants_of(&self, item_id: i32) -> AppResult<Vec<i32>> {
        let ids: Vec<i32> = VerificationRequest::find()
            .select_only()
            .column(verification_request::Column::ClaimantId)
            .filter(verification_request::Column::ItemId.eq(item_id))
            .distinct()
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids)
    }
}
