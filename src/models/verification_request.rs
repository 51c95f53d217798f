use super::enums::VerificationStatus;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Answers to the ownership questions asked on the claim form.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct SecurityAnswers {
    #[serde(default, alias = "purchaseDate", skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
    #[serde(
        default,
        alias = "purchaseLocation",
        skip_serializing_if = "Option::is_none"
    )]
    pub purchase_location: Option<String>,
    #[serde(
        default,
        alias = "specificDetails",
        skip_serializing_if = "Option::is_none"
    )]
    pub specific_details: Option<String>,
}

impl SecurityAnswers {
    pub fn is_empty(&self) -> bool {
        self.purchase_date.is_none()
            && self.purchase_location.is_none()
            && self.specific_details.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "verification_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub item_id: i32,
    pub claimant_id: i32,
    pub purchase_proof_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub identification_marks: Option<String>,
    pub photo_with_item_urls: Vec<String>,
    pub additional_proof_urls: Vec<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub security_answers: Option<SecurityAnswers>,
    pub claimant_phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,
    pub status: VerificationStatus,
    pub decided_by: Option<i32>,
    pub decided_at: Option<DateTime>,
    pub sms_sent: bool,
    pub sms_sent_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ClaimantId",
        to = "super::user::Column::Id"
    )]
    Claimant,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_answers_accept_client_camel_case() {
        let answers: SecurityAnswers = serde_json::from_str(
            r#"{"purchaseDate":"2024-03-01","purchaseLocation":"Croma, Andheri"}"#,
        )
        .unwrap();
        assert_eq!(answers.purchase_date.as_deref(), Some("2024-03-01"));
        assert_eq!(answers.purchase_location.as_deref(), Some("Croma, Andheri"));
        assert!(answers.specific_details.is_none());
    }

    #[test]
    fn security_answers_serialize_snake_case_without_nulls() {
        let answers = SecurityAnswers {
            specific_details: Some("scratch near the lens".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(json, serde_json::json!({"specific_details": "scratch near the lens"}));
    }

    #[test]
    fn unknown_answer_keys_are_ignored() {
        let answers: SecurityAnswers =
            serde_json::from_str(r#"{"favouriteColour":"blue"}"#).unwrap();
        assert!(answers.is_empty());
    }
}
