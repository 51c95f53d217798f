use super::enums::{ItemCategory, ItemStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub finder_id: i32,
    pub organization_id: Option<i32>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: ItemCategory,
    pub city: String,
    pub area: String,
    pub specific_location: String,
    pub date_found: Date,
    pub image_urls: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_method: Option<String>,
    pub status: ItemStatus,
    pub views: i32,
    pub expires_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FinderId",
        to = "super::user::Column::Id"
    )]
    Finder,
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(has_many = "super::verification_request::Entity")]
    VerificationRequest,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::verification_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VerificationRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
