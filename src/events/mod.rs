//! Domain events emitted after committed writes, and the in-process feed that
//! fans them out to listeners (the WebSocket relay and the counter updater).

pub mod counters;
pub mod feed;

pub use counters::CounterUpdater;
pub use feed::{ChangeFeed, EventFilter};

use crate::error::AppError;
use crate::models::{ItemStatus, ReviewStatus, VerificationStatus};
use serde::Serialize;
use std::str::FromStr;

/// The table a change belongs to. Clients subscribe by table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Items,
    VerificationRequests,
    Organizations,
}

impl FromStr for Topic {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "items" => Ok(Topic::Items),
            "verification_requests" | "claims" => Ok(Topic::VerificationRequests),
            "organizations" => Ok(Topic::Organizations),
            _ => Err(AppError::Validation(
                "table must be one of: items, verification_requests, organizations".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    ItemCreated {
        item_id: i32,
        finder_id: i32,
        organization_id: Option<i32>,
    },
    ItemStatusChanged {
        item_id: i32,
        finder_id: i32,
        organization_id: Option<i32>,
        status: ItemStatus,
    },
    ItemDeleted {
        item_id: i32,
        finder_id: i32,
        organization_id: Option<i32>,
        /// Claimants whose requests went away with the item.
        claimant_ids: Vec<i32>,
    },
    VerificationSubmitted {
        request_id: i32,
        item_id: i32,
        claimant_id: i32,
        finder_id: i32,
        organization_id: Option<i32>,
    },
    VerificationDecided {
        request_id: i32,
        item_id: i32,
        claimant_id: i32,
        finder_id: i32,
        organization_id: Option<i32>,
        status: VerificationStatus,
    },
    OrganizationChanged {
        organization_id: i32,
        review_status: ReviewStatus,
        is_active: bool,
    },
}

impl DomainEvent {
    pub fn topic(&self) -> Topic {
        match self {
            DomainEvent::ItemCreated { .. }
            | DomainEvent::ItemStatusChanged { .. }
            | DomainEvent::ItemDeleted { .. } => Topic::Items,
            DomainEvent::VerificationSubmitted { .. } | DomainEvent::VerificationDecided { .. } => {
                Topic::VerificationRequests
            }
            DomainEvent::OrganizationChanged { .. } => Topic::Organizations,
        }
    }

    pub fn organization_id(&self) -> Option<i32> {
        match self {
            DomainEvent::ItemCreated {
                organization_id, ..
            }
            | DomainEvent::ItemStatusChanged {
                organization_id, ..
            }
            | DomainEvent::ItemDeleted {
                organization_id, ..
            }
            | DomainEvent::VerificationSubmitted {
                organization_id, ..
            }
            | DomainEvent::VerificationDecided {
                organization_id, ..
            } => *organization_id,
            DomainEvent::OrganizationChanged {
                organization_id, ..
            } => Some(*organization_id),
        }
    }

    /// Users directly party to a claim event (the claimant and the finder).
    pub fn claim_parties(&self) -> Option<(i32, i32)> {
        match self {
            DomainEvent::VerificationSubmitted {
                claimant_id,
                finder_id,
                ..
            }
            | DomainEvent::VerificationDecided {
                claimant_id,
                finder_id,
                ..
            } => Some((*claimant_id, *finder_id)),
            _ => None,
        }
    }

    /// Users whose profile aggregates may have changed.
    pub fn affected_users(&self) -> Vec<i32> {
        match self {
            DomainEvent::ItemCreated { finder_id, .. }
            | DomainEvent::ItemStatusChanged { finder_id, .. } => vec![*finder_id],
            DomainEvent::ItemDeleted {
                finder_id,
                claimant_ids,
                ..
            } => {
                let mut users = vec![*finder_id];
                users.extend(claimant_ids.iter().copied());
                users.sort_unstable();
                users.dedup();
                users
            }
            DomainEvent::VerificationDecided {
                claimant_id,
                finder_id,
                status,
                ..
            } if *status == VerificationStatus::Approved => {
                if claimant_id == finder_id {
                    vec![*finder_id]
                } else {
                    vec![*claimant_id, *finder_id]
                }
            }
            _ => Vec::new(),
        }
    }
}
