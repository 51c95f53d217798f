mod common;

use serde_json::Value;

#[tokio::test]
async fn register_returns_token_and_creates_profile() {
    let app = common::spawn_app().await;
    let user = common::create_test_user_with_phone(&app, "finder", Some("+15550002222")).await;

    let resp = app
        .client
        .get(app.url("/auth/me"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], user.id);
    assert_eq!(body["data"]["email"], user.email.as_str());
    assert_eq!(body["data"]["role"], "user");
    assert_eq!(body["data"]["organization_ids"], serde_json::json!([]));
    assert_eq!(body["data"]["profile"]["phone"], "+15550002222");
    assert_eq!(body["data"]["profile"]["items_found"], 0);
    assert_eq!(body["data"]["profile"]["reputation_score"], 0);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "dup").await;

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&serde_json::json!({
            "email": user.email.to_uppercase(),
            "password": common::PASSWORD,
            "full_name": "Someone Else",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&serde_json::json!({
            "email": "short@test.com",
            "password": "abc",
            "full_name": "Short Password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn login_with_valid_and_invalid_password() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "login").await;

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&serde_json::json!({"email": user.email, "password": common::PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user_id"], user.id);
    assert!(body["data"]["token"].as_str().is_some());

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&serde_json::json!({"email": user.email, "password": "wrong_password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn protected_route_requires_token() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(app.url("/auth/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn update_own_profile_and_read_it_publicly() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "profile").await;

    let resp = app
        .client
        .put(app.url("/profiles/me"))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({"full_name": "Asha Rao", "phone": "+15550003333"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/profiles/{}", user.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["full_name"], "Asha Rao");
    assert_eq!(body["data"]["phone"], "+15550003333");
}
