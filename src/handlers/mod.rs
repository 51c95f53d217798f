pub mod admin;
pub mod auth;
pub mod item;
pub mod organization;
pub mod profile;
pub mod upload;
pub mod verification;

pub use auth::*;
