use chrono::Duration;
use super::env_parse;

/// Settings for the item and claim workflow.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    /// How long a newly posted item stays listed.
    pub item_ttl: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            item_ttl: Duration::days(30),
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        let days = match env_parse("ITEM_TTL_DAYS", 30i64) {
            d if d > 0 => d,
            _ => 30,
        };

        Self {
            item_ttl: Duration::days(days),
        }
    }
}
