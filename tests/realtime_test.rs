mod common;

use futures_util::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(app: &common::TestApp, query: &str) -> Socket {
    let (socket, _) = connect_async(app.ws_url(query))
        .await
        .expect("WebSocket handshake failed");
    socket
}

/// Next text frame as JSON, or `None` if nothing arrives in time.
async fn next_event(socket: &mut Socket, wait: Duration) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(wait, socket.next()).await.ok()??.ok()?;
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().ok()?).ok();
        }
    }
}

#[tokio::test]
async fn claimant_receives_decision_over_websocket() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let stranger = common::create_test_user(&app, "stranger").await;
    let item_id = common::create_test_item(&app, &finder, "Green scarf", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let listeners = app.feed.subscriber_count();
    let mut claimant_ws = connect(
        &app,
        &format!("token={}&table=verification_requests", claimant.token),
    )
    .await;
    let mut stranger_ws = connect(
        &app,
        &format!("token={}&table=verification_requests", stranger.token),
    )
    .await;
    let feed = app.feed.clone();
    assert!(
        common::eventually(move || {
            let feed = feed.clone();
            async move { feed.subscriber_count() >= listeners + 2 }
        })
        .await,
        "relay did not subscribe to the change feed"
    );

    let resp = common::decide(&app, &finder.token, request_id, "approved").await;
    assert_eq!(resp.status(), 200);

    let event = next_event(&mut claimant_ws, Duration::from_secs(5))
        .await
        .expect("no event reached the claimant");
    assert_eq!(event["event"], "verification_decided");
    assert_eq!(event["request_id"], request_id);
    assert_eq!(event["item_id"], item_id);
    assert_eq!(event["status"], "approved");

    // Other users' claims stay private.
    assert!(next_event(&mut stranger_ws, Duration::from_millis(500))
        .await
        .is_none());
}

#[tokio::test]
async fn websocket_rejects_bad_token() {
    let app = common::spawn_app().await;
    let result = connect_async(app.ws_url("token=not-a-jwt")).await;
    assert!(result.is_err());
}
