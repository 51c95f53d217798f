use super::enums::ReviewStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "String(StringLen::N(50))")]
    pub org_type: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_email: String,
    pub contact_phone: String,
    pub logo_url: Option<String>,
    pub radius_meters: i32,
    pub require_location_verification: bool,
    pub is_verified: bool,
    pub is_active: bool,
    pub review_status: ReviewStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::organization_admin::Entity")]
    OrganizationAdmin,
    #[sea_orm(has_many = "super::item::Entity")]
    Item,
}

impl Related<super::organization_admin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrganizationAdmin.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
