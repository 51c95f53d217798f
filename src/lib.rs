pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod utils;
pub mod websocket;

pub use error::{AppError, AppResult};
pub use events::{ChangeFeed, DomainEvent};
pub use response::{ApiResponse, PaginatedResponse, PaginationQuery};
pub use services::access::Actor;
