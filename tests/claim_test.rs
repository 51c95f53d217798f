mod common;

use lostfound::models::Decision;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

async fn item_status(app: &common::TestApp, item_id: i32) -> String {
    let body: Value = app
        .client
        .get(app.url(&format!("/items/{}", item_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"]["status"].as_str().unwrap().to_string()
}

async fn claim(app: &common::TestApp, token: &str, request_id: i32) -> Value {
    let resp = app
        .client
        .get(app.url(&format!("/claims/{}", request_id)))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn finder_approves_claim_and_item_is_returned() {
    let mut app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Black iPhone 13", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = common::decide(&app, &finder.token, request_id, "approved").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["decided_by"], finder.id);
    assert_eq!(body["data"]["admin_notes"], "checked receipt");

    assert_eq!(item_status(&app, item_id).await, "returned");

    let sms = app.next_sms().await.expect("decision SMS was not dispatched");
    assert_eq!(sms.phone, "+15550001111");
    assert_eq!(sms.item_title, "Black iPhone 13");
    assert_eq!(sms.status, Decision::Approved);

    let app_ref = &app;
    let token = claimant.token.clone();
    let recorded = common::eventually(move || {
        let token = token.clone();
        async move { claim(app_ref, &token, request_id).await["sms_sent"] == true }
    })
    .await;
    assert!(recorded, "sms_sent was not recorded");
}

#[tokio::test]
async fn approval_updates_claimant_and_finder_counters() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Wallet", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = common::decide(&app, &finder.token, request_id, "approve").await;
    assert_eq!(resp.status(), 200);

    let app_ref = &app;
    let (finder_id, claimant_id) = (finder.id, claimant.id);
    let updated = common::eventually(move || async move {
        let profile = move |id: i32| async move {
            let body: Value = app_ref
                .client
                .get(app_ref.url(&format!("/profiles/{}", id)))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            body["data"].clone()
        };
        let finder = profile(finder_id).await;
        let claimant = profile(claimant_id).await;
        finder["reputation_score"] == 10 && claimant["items_claimed"] == 1
    })
    .await;
    assert!(updated, "counters were not recomputed");
}

#[tokio::test]
async fn concurrent_claims_are_both_accepted() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let first = common::create_test_user(&app, "first").await;
    let second = common::create_test_user(&app, "second").await;
    let item_id = common::create_test_item(&app, &finder, "Backpack", None).await;

    let (a, b) = tokio::join!(
        common::submit_claim(&app, &first, item_id),
        common::submit_claim(&app, &second, item_id),
    );
    assert_ne!(a, b);

    let resp = app
        .client
        .get(app.url(&format!("/items/{}/claims", item_id)))
        .bearer_auth(&finder.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 2);

    // Approving one leaves the sibling pending.
    let resp = common::decide(&app, &finder.token, a, "approved").await;
    assert_eq!(resp.status(), 200);
    let sibling = claim(&app, &finder.token, b).await;
    assert_eq!(sibling["status"], "pending");

    // But it can no longer be approved: the item is already returned.
    let resp = common::decide(&app, &finder.token, b, "approved").await;
    assert_eq!(resp.status(), 409);
    let sibling = claim(&app, &finder.token, b).await;
    assert_eq!(sibling["status"], "pending");
    assert!(sibling["decided_by"].is_null());

    // Rejecting it still works.
    let resp = common::decide(&app, &finder.token, b, "rejected").await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn deciding_twice_is_invalid_state() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Keys", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = common::decide(&app, &finder.token, request_id, "rejected").await;
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .put(app.url(&format!("/claims/{}/decision", request_id)))
        .bearer_auth(&finder.token)
        .json(&serde_json::json!({"decision": "approved", "notes": "changed my mind"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let stored = claim(&app, &claimant.token, request_id).await;
    assert_eq!(stored["status"], "rejected");
    assert_eq!(stored["admin_notes"], "checked receipt");
    assert_eq!(item_status(&app, item_id).await, "available");
}

#[tokio::test]
async fn rejection_leaves_item_available() {
    let mut app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Sunglasses", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = common::decide(&app, &finder.token, request_id, "rejected").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(item_status(&app, item_id).await, "available");

    let sms = app.next_sms().await.expect("rejection SMS was not dispatched");
    assert_eq!(sms.status, Decision::Rejected);
}

#[tokio::test]
async fn strangers_cannot_decide_or_view() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let stranger = common::create_test_user(&app, "stranger").await;
    let item_id = common::create_test_item(&app, &finder, "Camera", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = common::decide(&app, &stranger.token, request_id, "approved").await;
    assert_eq!(resp.status(), 403);

    // The claimant cannot adjudicate their own claim either.
    let resp = common::decide(&app, &claimant.token, request_id, "approved").await;
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .get(app.url(&format!("/claims/{}", request_id)))
        .bearer_auth(&stranger.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .get(app.url(&format!("/items/{}/claims", item_id)))
        .bearer_auth(&stranger.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    assert_eq!(claim(&app, &claimant.token, request_id).await["status"], "pending");
}

#[tokio::test]
async fn unknown_decision_and_missing_request() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Ring", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = common::decide(&app, &finder.token, request_id, "pending").await;
    assert_eq!(resp.status(), 400);

    let resp = common::decide(&app, &finder.token, 999_999, "approved").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn claims_on_non_available_items_are_refused() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Headphones", None).await;

    let resp = app
        .client
        .put(app.url(&format!("/items/{}/status", item_id)))
        .bearer_auth(&finder.token)
        .json(&serde_json::json!({"status": "verified"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .post(app.url(&format!("/items/{}/claims", item_id)))
        .bearer_auth(&claimant.token)
        .json(&serde_json::json!({"identification_marks": "Initials on the band"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = app
        .client
        .post(app.url("/items/999999/claims"))
        .bearer_auth(&claimant.token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn claim_lists_for_claimant_and_finder() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Tablet", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = app
        .client
        .get(app.url("/me/claims"))
        .bearer_auth(&claimant.token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], request_id);
    assert_eq!(body["data"]["items"][0]["item"]["title"], "Tablet");
    assert_eq!(
        body["data"]["items"][0]["security_answers"]["purchase_date"],
        "2023-12-24"
    );

    let resp = app
        .client
        .get(app.url("/me/finds/claims"))
        .bearer_auth(&finder.token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);

    let resp = app
        .client
        .get(app.url("/me/claims"))
        .bearer_auth(&finder.token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn multipart_claim_stores_proof_files() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Handbag", None).await;

    let png = || {
        Part::bytes(common::PNG_BYTES.to_vec())
            .file_name("proof.png")
            .mime_str("image/png")
            .unwrap()
    };
    let form = Form::new()
        .part("purchase_proof", png())
        .part("photo_with_item", png())
        .part("photo_with_item", png())
        .text("identification_marks", "Torn lining")
        .text("purchase_location", "Phoenix Mall");

    let resp = app
        .client
        .post(app.url(&format!("/items/{}/claims/upload", item_id)))
        .bearer_auth(&claimant.token)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let proof = body["data"]["purchase_proof_url"].as_str().unwrap();
    assert!(proof.starts_with("/uploads/proofs/"));
    assert_eq!(body["data"]["photo_with_item_urls"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["data"]["security_answers"]["purchase_location"],
        "Phoenix Mall"
    );
}

#[tokio::test]
async fn storage_failure_leaves_no_claim_behind() {
    let app = common::spawn_app_with_failing_storage().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Guitar", None).await;

    let form = Form::new()
        .part(
            "purchase_proof",
            Part::bytes(common::PNG_BYTES.to_vec())
                .file_name("receipt.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .text("identification_marks", "Sticker on the case");

    let resp = app
        .client
        .post(app.url(&format!("/items/{}/claims/upload", item_id)))
        .bearer_auth(&claimant.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    let resp = app
        .client
        .get(app.url("/me/claims"))
        .bearer_auth(&claimant.token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn non_image_proof_is_rejected() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Laptop", None).await;

    let form = Form::new().part(
        "additional_proof",
        Part::bytes(b"not really a png".to_vec())
            .file_name("fake.png")
            .mime_str("image/png")
            .unwrap(),
    );

    let resp = app
        .client
        .post(app.url(&format!("/items/{}/claims/upload", item_id)))
        .bearer_auth(&claimant.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn invalid_later_file_stores_nothing() {
    let app = common::spawn_app().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Camera", None).await;
    let stored_before = app.stored_files("proofs");

    let form = Form::new()
        .part(
            "purchase_proof",
            Part::bytes(common::PNG_BYTES.to_vec())
                .file_name("receipt.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .part(
            "photo_with_item",
            Part::bytes(b"GIF89a but not quite".to_vec())
                .file_name("me.png")
                .mime_str("image/png")
                .unwrap(),
        );

    let resp = app
        .client
        .post(app.url(&format!("/items/{}/claims/upload", item_id)))
        .bearer_auth(&claimant.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(app.stored_files("proofs"), stored_before);

    let body: Value = app
        .client
        .get(app.url("/me/claims"))
        .bearer_auth(&claimant.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn undelivered_sms_keeps_decision() {
    let mut app = common::spawn_app_with_failing_sms().await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;
    let item_id = common::create_test_item(&app, &finder, "Bicycle helmet", None).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = common::decide(&app, &finder.token, request_id, "approved").await;
    assert_eq!(resp.status(), 200);

    let sms = app.next_sms().await.expect("dispatcher was not called");
    assert_eq!(sms.status, Decision::Approved);
    // Give the notification task time to finish before reading the row.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    assert_eq!(item_status(&app, item_id).await, "returned");
    let request = claim(&app, &claimant.token, request_id).await;
    assert_eq!(request["status"], "approved");
    assert_eq!(request["sms_sent"], false);
    assert!(request["sms_sent_at"].is_null());
}
