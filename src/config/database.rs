use super::env_parse;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::env;
use std::time::Duration;

/// Connection pool settings read from `DB_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub log_statements: bool,
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self, DbErr> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| DbErr::Custom("DATABASE_URL must be set".to_string()))?;
        Ok(Self::with_url(url))
    }

    fn with_url(url: String) -> Self {
        let max_connections = env_parse("DB_MAX_CONNECTIONS", 10u32).max(1);
        // The pool cannot keep more idle connections than it may open.
        let min_connections = env_parse("DB_MIN_CONNECTIONS", 2u32).min(max_connections);
        Self {
            url,
            max_connections,
            min_connections,
            log_statements: env_parse("DB_LOG_STATEMENTS", true),
        }
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(self.log_statements);
        opt
    }
}

pub async fn get_database() -> Result<DatabaseConnection, DbErr> {
    let settings = DatabaseSettings::from_env()?;
    tracing::debug!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "Connecting to database"
    );
    Database::connect(settings.connect_options()).await
}
