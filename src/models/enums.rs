use crate::error::{AppError, AppResult};
use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Parse a raw string into a string-backed enum, rejecting unknown values
/// with the list of accepted ones.
fn parse_variant<T>(raw: &str, field: &str) -> AppResult<T>
where
    T: ActiveEnum<Value = String> + Iterable,
{
    let normalized = raw.trim().to_ascii_lowercase();
    T::try_from_value(&normalized).map_err(|_| {
        let accepted: Vec<String> = T::iter().map(|v| v.to_value()).collect();
        AppError::Validation(format!(
            "{} must be one of: {}",
            field,
            accepted.join(", ")
        ))
    })
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    #[sea_orm(string_value = "electronics")]
    Electronics,
    #[sea_orm(string_value = "wallets_purses")]
    WalletsPurses,
    #[sea_orm(string_value = "keys")]
    Keys,
    #[sea_orm(string_value = "bags")]
    Bags,
    #[sea_orm(string_value = "documents")]
    Documents,
    #[sea_orm(string_value = "jewelry")]
    Jewelry,
    #[sea_orm(string_value = "clothing")]
    Clothing,
    #[sea_orm(string_value = "accessories")]
    Accessories,
    #[sea_orm(string_value = "other")]
    Other,
}

impl FromStr for ItemCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "category")
    }
}

/// Lifecycle status of a found item. Transitions are not guarded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "claimed")]
    Claimed,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "returned")]
    Returned,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Claimed => "claimed",
            ItemStatus::Verified => "verified",
            ItemStatus::Returned => "returned",
        }
    }

    pub fn is_claimable(&self) -> bool {
        matches!(self, ItemStatus::Available)
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "status")
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Approved and rejected requests are final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

impl FromStr for VerificationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "status")
    }
}

/// Outcome an adjudicator may apply to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_status(&self) -> VerificationStatus {
        match self {
            Decision::Approved => VerificationStatus::Approved,
            Decision::Rejected => VerificationStatus::Rejected,
        }
    }

    /// Item status the decision moves the claimed item to, if any.
    pub fn item_transition(&self) -> Option<ItemStatus> {
        match self {
            Decision::Approved => Some(ItemStatus::Returned),
            Decision::Rejected => None,
        }
    }
}

impl FromStr for Decision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" => Ok(Decision::Approved),
            "rejected" | "reject" => Ok(Decision::Rejected),
            _ => Err(AppError::Validation(
                "decision must be one of: approved, rejected".to_string(),
            )),
        }
    }
}

/// Platform-wide role, stored separately from the profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::User => "user",
            AppRole::Admin => "admin",
        }
    }
}

impl FromStr for AppRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "role")
    }
}

/// Review outcome of a self-registered organization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "review_status")
    }
}
