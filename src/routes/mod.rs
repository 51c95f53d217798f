use crate::config::rate_limit::{LimitGroup, RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use crate::websocket;
use axum::{extract::DefaultBodyLimit, middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

/// A claim may carry a purchase proof plus up to ten photos and ten documents.
const CLAIM_UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;
const IMAGE_UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

pub fn create_routes() -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        // Auth handled inside the handler via query token
        .route("/ws", routing::get(websocket::ws_handler))
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let auth = auth_routes(&rate_limit_config);
    let public_read = public_read_routes(&rate_limit_config);
    let claims = claim_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    auth.merge(public_read).merge(claims).merge(protected)
}

fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/register", routing::post(handlers::register))
        .route("/auth/login", routing::post(handlers::login));

    with_optional_rate_limit(router, config.enabled, config.rule(LimitGroup::Auth))
}

/// Public reads: the item board, organizations and profiles.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/items", routing::get(handlers::item::list_items))
        .route("/items/{id}", routing::get(handlers::item::get_item))
        .route(
            "/organizations",
            routing::get(handlers::organization::list_organizations),
        )
        .route(
            "/organizations/{id}",
            routing::get(handlers::organization::get_organization),
        )
        .route(
            "/profiles/{user_id}",
            routing::get(handlers::profile::get_profile),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(LimitGroup::PublicRead))
}

/// Claim submission and adjudication, throttled separately.
fn claim_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/items/{id}/claims",
            routing::post(handlers::verification::submit_claim),
        )
        .route(
            "/items/{id}/claims/upload",
            routing::post(handlers::verification::submit_claim_with_files)
                .layer(DefaultBodyLimit::max(CLAIM_UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/claims/{id}/decision",
            routing::put(handlers::verification::decide_claim),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(LimitGroup::Claims))
}

fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Auth & profile
        .route("/auth/me", routing::get(handlers::me))
        .route(
            "/profiles/me",
            routing::put(handlers::profile::update_my_profile),
        )
        // Items
        .route("/items", routing::post(handlers::item::create_item))
        .route(
            "/items/{id}",
            routing::delete(handlers::item::delete_item),
        )
        .route(
            "/items/{id}/status",
            routing::put(handlers::item::update_item_status),
        )
        .route("/me/items", routing::get(handlers::item::list_my_items))
        // Claims
        .route(
            "/items/{id}/claims",
            routing::get(handlers::verification::list_item_claims),
        )
        .route(
            "/me/claims",
            routing::get(handlers::verification::list_my_claims),
        )
        .route(
            "/me/finds/claims",
            routing::get(handlers::verification::list_claims_on_my_finds),
        )
        .route(
            "/claims/{id}",
            routing::get(handlers::verification::get_claim),
        )
        // Organizations
        .route(
            "/organizations",
            routing::post(handlers::organization::register_organization),
        )
        .route(
            "/organizations/{id}/claims",
            routing::get(handlers::verification::list_organization_claims),
        )
        .route(
            "/organizations/{id}/admins",
            routing::get(handlers::organization::list_admins)
                .post(handlers::organization::assign_admin),
        )
        .route(
            "/organizations/{id}/admins/{admin_id}",
            routing::delete(handlers::organization::remove_admin),
        )
        .route(
            "/organizations/{id}/stats",
            routing::get(handlers::organization::organization_stats),
        )
        // Admin
        .route("/admin/stats", routing::get(handlers::admin::get_stats))
        .route("/admin/users", routing::get(handlers::admin::list_users))
        .route(
            "/admin/users/{id}/role",
            routing::put(handlers::admin::update_user_role),
        )
        .route(
            "/admin/claims",
            routing::get(handlers::verification::admin_list_claims),
        )
        .route(
            "/admin/organizations",
            routing::get(handlers::organization::list_review_queue),
        )
        .route(
            "/admin/organizations/{id}/approve",
            routing::put(handlers::organization::approve_organization),
        )
        .route(
            "/admin/organizations/{id}/reject",
            routing::put(handlers::organization::reject_organization),
        )
        .route(
            "/admin/items/expire",
            routing::post(handlers::admin::expire_items),
        )
        // Upload
        .route(
            "/upload/image",
            routing::post(handlers::upload::upload_image)
                .layer(DefaultBodyLimit::max(IMAGE_UPLOAD_BODY_LIMIT)),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(LimitGroup::Protected))
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!(?rule, "Invalid rate limit rule, group left unthrottled");
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
