pub mod app;
pub mod database;
pub mod jwt;
pub mod rate_limit;
pub mod sms;

use std::env;
use std::str::FromStr;

pub use app::WorkflowConfig;
pub use database::{get_database, DatabaseSettings};
pub use jwt::JwtConfig;
pub use rate_limit::{LimitGroup, RateLimitConfig, RateLimitRule};
pub use sms::SmsConfig;

/// Parse an environment variable, falling back to `default` when unset or malformed.
pub(crate) fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
