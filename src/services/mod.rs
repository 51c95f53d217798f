pub mod access;
pub mod admin;
pub mod auth;
pub mod bootstrap_admin;
pub mod item;
pub mod organization;
pub mod profile;
pub mod sms;
pub mod upload;
pub mod verification;
