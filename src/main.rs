use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use lostfound::config::{self, WorkflowConfig};
use lostfound::events::{ChangeFeed, CounterUpdater};
use lostfound::migration::Migrator;
use lostfound::routes;
use lostfound::services::{
    bootstrap_admin::ensure_bootstrap_admin,
    sms::{SharedSms, TwilioDispatcher},
    upload::{LocalStorage, SharedStorage, UploadConfig},
};
use lostfound::utils;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Auth & profiles
        lostfound::handlers::auth::register,
        lostfound::handlers::auth::login,
        lostfound::handlers::auth::me,
        lostfound::handlers::profile::get_profile,
        lostfound::handlers::profile::update_my_profile,
        // Items
        lostfound::handlers::item::create_item,
        lostfound::handlers::item::list_items,
        lostfound::handlers::item::get_item,
        lostfound::handlers::item::update_item_status,
        lostfound::handlers::item::delete_item,
        lostfound::handlers::item::list_my_items,
        // Claims
        lostfound::handlers::verification::submit_claim,
        lostfound::handlers::verification::submit_claim_with_files,
        lostfound::handlers::verification::list_item_claims,
        lostfound::handlers::verification::list_my_claims,
        lostfound::handlers::verification::list_claims_on_my_finds,
        lostfound::handlers::verification::list_organization_claims,
        lostfound::handlers::verification::get_claim,
        lostfound::handlers::verification::decide_claim,
        // Organizations
        lostfound::handlers::organization::register_organization,
        lostfound::handlers::organization::list_organizations,
        lostfound::handlers::organization::get_organization,
        lostfound::handlers::organization::assign_admin,
        lostfound::handlers::organization::list_admins,
        lostfound::handlers::organization::remove_admin,
        lostfound::handlers::organization::organization_stats,
        // Uploads
        lostfound::handlers::upload::upload_image,
        // Admin
        lostfound::handlers::admin::get_stats,
        lostfound::handlers::admin::list_users,
        lostfound::handlers::admin::update_user_role,
        lostfound::handlers::admin::expire_items,
        lostfound::handlers::verification::admin_list_claims,
        lostfound::handlers::organization::list_review_queue,
        lostfound::handlers::organization::approve_organization,
        lostfound::handlers::organization::reject_organization,
    ),
    components(
        schemas(
            lostfound::response::ApiResponse<serde_json::Value>,
            lostfound::response::PaginatedResponse<serde_json::Value>,
            lostfound::response::PaginationQuery,
            lostfound::error::AppError,
            lostfound::models::ItemCategory,
            lostfound::models::ItemStatus,
            lostfound::models::VerificationStatus,
            lostfound::models::ReviewStatus,
            lostfound::models::AppRole,
            lostfound::models::SecurityAnswers,
            // Auth & profiles
            lostfound::handlers::auth::RegisterRequest,
            lostfound::handlers::auth::LoginRequest,
            lostfound::handlers::auth::AuthResponse,
            lostfound::handlers::auth::MeResponse,
            lostfound::handlers::auth::ProfileResponse,
            lostfound::handlers::profile::UpdateProfileRequest,
            // Items
            lostfound::handlers::item::CreateItemRequest,
            lostfound::handlers::item::UpdateItemStatusRequest,
            lostfound::handlers::item::ItemResponse,
            // Claims
            lostfound::handlers::verification::SubmitClaimRequest,
            lostfound::handlers::verification::DecideClaimRequest,
            lostfound::handlers::verification::ClaimResponse,
            lostfound::handlers::verification::ClaimItemSummary,
            // Organizations
            lostfound::handlers::organization::RegisterOrganizationRequest,
            lostfound::handlers::organization::AssignAdminRequest,
            lostfound::handlers::organization::OrganizationResponse,
            lostfound::handlers::organization::OrganizationAdminResponse,
            lostfound::handlers::organization::OrganizationStatsResponse,
            // Uploads
            lostfound::handlers::upload::UploadResponse,
            // Admin
            lostfound::handlers::admin::StatsResponse,
            lostfound::handlers::admin::AdminUserResponse,
            lostfound::handlers::admin::UpdateRoleRequest,
            lostfound::handlers::admin::ExpireItemsResponse,
        )
    ),
    modifiers(&JwtSecurity),
    tags(
        (name = "auth", description = "Registration, login and current user"),
        (name = "profiles", description = "Public profiles and counters"),
        (name = "items", description = "Found item registry"),
        (name = "claims", description = "Ownership verification requests"),
        (name = "organizations", description = "Partner organizations and their admins"),
        (name = "uploads", description = "Image uploads"),
        (name = "admin", description = "Platform administration"),
    )
)]
struct ApiDoc;

struct JwtSecurity;

impl Modify for JwtSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    // Validate configuration before doing anything else
    let jwt_config = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting Lost & Found API v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::get_database().await?;
    tracing::info!("Database connected successfully");

    Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    ensure_bootstrap_admin(&db).await?;

    let feed = ChangeFeed::new();
    CounterUpdater::new(db.clone(), feed.clone()).spawn();

    let upload_config = UploadConfig::from_env();
    let storage: SharedStorage = Arc::new(LocalStorage::new(&upload_config));

    let dispatcher = TwilioDispatcher::from_env();
    if dispatcher.is_configured() {
        tracing::info!("Twilio SMS dispatcher configured");
    } else {
        tracing::warn!("Twilio credentials not set, decision SMS will be skipped");
    }
    let sms: SharedSms = Arc::new(dispatcher);

    let app = create_app(&upload_config.upload_dir)
        .layer(Extension(db))
        .layer(Extension(feed))
        .layer(Extension(storage))
        .layer(Extension(sms))
        .layer(Extension(WorkflowConfig::from_env()));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lostfound=debug,tower_http=debug,axum=debug".into());
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<config::JwtConfig> {
    let jwt_config = config::JwtConfig::from_env()?;

    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    let upload_dir = UploadConfig::from_env().upload_dir;
    std::fs::create_dir_all(&upload_dir).map_err(|e| {
        anyhow::anyhow!("Failed to create upload directory '{}': {}", upload_dir, e)
    })?;

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app(upload_dir: &str) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Lost & Found API",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
