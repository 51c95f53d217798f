use crate::error::AppError;
use crate::events::{ChangeFeed, DomainEvent, EventFilter, Topic};
use crate::middleware::auth::resolve_actor;
use crate::services::access::Actor;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: String,
    /// items, verification_requests or organizations; all when absent
    pub table: Option<String>,
    pub organization_id: Option<i32>,
}

impl WsQuery {
    fn filter(&self) -> Result<EventFilter, AppError> {
        let topic = match self.table.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<Topic>()?),
            _ => None,
        };
        Ok(EventFilter {
            topic,
            organization_id: self.organization_id,
        })
    }
}

/// Claim events only reach the two parties and the item's adjudicators.
pub fn visible_to(actor: &Actor, event: &DomainEvent) -> bool {
    let Some((claimant_id, finder_id)) = event.claim_parties() else {
        return true;
    };
    actor.is_global_admin()
        || actor.user_id == claimant_id
        || actor.user_id == finder_id
        || event
            .organization_id()
            .is_some_and(|org_id| actor.is_org_admin(org_id))
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<ChangeFeed>,
) -> Result<impl IntoResponse, AppError> {
    let actor = resolve_actor(&db, &query.token).await?;
    let filter = query.filter()?;

    Ok(ws.on_upgrade(move |socket| relay_events(socket, actor, filter, feed)))
}

async fn relay_events(socket: WebSocket, actor: Actor, filter: EventFilter, feed: ChangeFeed) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (subscription, mut rx) = feed.subscribe(filter);
    let user_id = actor.user_id;

    tracing::info!(user_id, subscription, "Change feed relay connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !visible_to(&actor, &event) {
                continue;
            }
            let payload = match serde_json::to_string(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    feed.unsubscribe(subscription);
    tracing::info!(user_id, subscription, "Change feed relay disconnected");
}
