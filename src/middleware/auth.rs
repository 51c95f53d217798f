use crate::{
    error::AppError,
    services::access::{AccessService, Actor},
    utils::jwt::decode_jwt,
};
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::DatabaseConnection;

/// JWT authentication middleware
///
/// Verifies the bearer token, resolves the caller's roles and organization
/// memberships, and stores the resulting [`Actor`] in the request extensions.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let actor = resolve_actor(&db, &token).await?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Decode a token and build the actor for it.
pub async fn resolve_actor(db: &DatabaseConnection, token: &str) -> Result<Actor, AppError> {
    let claims = decode_jwt(token).map_err(|_| AppError::Unauthorized)?;
    AccessService::new(db.clone()).load_actor(claims.sub).await
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// The caller if a valid token was sent, for routes that are public but show
/// more to authorized users.
#[derive(Debug, Clone)]
pub struct OptionalActor(pub Option<Actor>);

impl<S> FromRequestParts<S> for OptionalActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(Self(Some(actor.clone())));
        }
        let Some(token) = extract_bearer_token(&parts.headers) else {
            return Ok(Self(None));
        };
        let db = parts
            .extensions
            .get::<DatabaseConnection>()
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("database extension missing")))?;
        resolve_actor(&db, &token).await.map(|a| Self(Some(a)))
    }
}
