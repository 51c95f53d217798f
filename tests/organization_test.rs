mod common;

use serde_json::Value;

async fn register_org(app: &common::TestApp, user: &common::TestUser, name: &str) -> i32 {
    let resp = app
        .client
        .post(app.url("/organizations"))
        .bearer_auth(&user.token)
        .json(&common::organization_payload(name))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["review_status"], "pending");
    assert_eq!(body["data"]["is_verified"], false);
    assert_eq!(body["data"]["is_active"], false);
    assert_eq!(body["data"]["radius_meters"], 500);
    body["data"]["id"].as_i64().unwrap() as i32
}

async fn assign(
    app: &common::TestApp,
    token: &str,
    org_id: i32,
    user_id: i32,
) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/organizations/{}/admins", org_id)))
        .bearer_auth(token)
        .json(&serde_json::json!({"user_id": user_id}))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn approval_makes_organization_public() {
    let app = common::spawn_app().await;
    let owner = common::create_test_user(&app, "owner").await;
    let admin = common::create_test_user(&app, "admin").await;
    common::make_admin(&app.db, admin.id).await;

    let org_id = register_org(&app, &owner, "Phoenix Mall").await;

    let body: Value = app
        .client
        .get(app.url("/organizations"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 0);

    let resp = app
        .client
        .get(app.url(&format!("/organizations/{}", org_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .put(app.url(&format!("/admin/organizations/{}/approve", org_id)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["review_status"], "approved");
    assert_eq!(body["data"]["is_verified"], true);
    assert_eq!(body["data"]["is_active"], true);

    let body: Value = app
        .client
        .get(app.url("/organizations"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Phoenix Mall");

    let resp = app
        .client
        .get(app.url(&format!("/organizations/{}", org_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn rejection_is_distinct_from_pending() {
    let app = common::spawn_app().await;
    let owner = common::create_test_user(&app, "owner").await;
    let admin = common::create_test_user(&app, "admin").await;
    common::make_admin(&app.db, admin.id).await;

    let rejected = register_org(&app, &owner, "Shady Storage").await;
    register_org(&app, &owner, "Airport T2").await;

    let resp = app
        .client
        .put(app.url(&format!("/admin/organizations/{}/reject", rejected)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["review_status"], "rejected");
    assert_eq!(body["data"]["is_active"], false);

    for (filter, expected) in [("pending", 1), ("rejected", 1), ("approved", 0)] {
        let body: Value = app
            .client
            .get(app.url(&format!("/admin/organizations?review_status={}", filter)))
            .bearer_auth(&admin.token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"]["total"], expected, "review_status={}", filter);
    }

    let resp = app
        .client
        .get(app.url("/admin/organizations?review_status=maybe"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn only_platform_admins_review() {
    let app = common::spawn_app().await;
    let owner = common::create_test_user(&app, "owner").await;
    let org_id = register_org(&app, &owner, "Corner Cafe").await;

    let resp = app
        .client
        .put(app.url(&format!("/admin/organizations/{}/approve", org_id)))
        .bearer_auth(&owner.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .get(app.url("/admin/organizations"))
        .bearer_auth(&owner.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn org_admin_adjudicates_items_of_their_organization() {
    let mut app = common::spawn_app().await;
    let admin = common::create_test_user(&app, "admin").await;
    common::make_admin(&app.db, admin.id).await;
    let desk = common::create_test_user(&app, "desk").await;
    let finder = common::create_test_user(&app, "finder").await;
    let claimant = common::create_test_user(&app, "claimant").await;

    let org_id = common::create_active_organization(&app, &desk, &admin).await;
    let resp = assign(&app, &admin.token, org_id, desk.id).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["role"], "admin");

    let body: Value = app
        .client
        .get(app.url("/auth/me"))
        .bearer_auth(&desk.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["organization_ids"], serde_json::json!([org_id]));

    let item_id = common::create_test_item(&app, &finder, "Umbrella", Some(org_id)).await;
    let request_id = common::submit_claim(&app, &claimant, item_id).await;

    let resp = app
        .client
        .get(app.url(&format!("/organizations/{}/claims", org_id)))
        .bearer_auth(&desk.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);

    let body: Value = app
        .client
        .get(app.url(&format!("/organizations/{}/stats", org_id)))
        .bearer_auth(&desk.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["pending_verifications"], 1);
    assert_eq!(body["data"]["admins"], 1);

    let resp = common::decide(&app, &desk.token, request_id, "approved").await;
    assert_eq!(resp.status(), 200);
    assert!(app.next_sms().await.is_some());

    // Someone else's organization stays off limits.
    let resp = app
        .client
        .get(app.url(&format!("/organizations/{}/claims", org_id)))
        .bearer_auth(&finder.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn org_admins_manage_the_admin_list() {
    let app = common::spawn_app().await;
    let admin = common::create_test_user(&app, "admin").await;
    common::make_admin(&app.db, admin.id).await;
    let desk = common::create_test_user(&app, "desk").await;
    let helper = common::create_test_user(&app, "helper").await;
    let outsider = common::create_test_user(&app, "outsider").await;

    let org_id = common::create_active_organization(&app, &desk, &admin).await;

    let resp = assign(&app, &outsider.token, org_id, outsider.id).await;
    assert_eq!(resp.status(), 403);

    assert_eq!(assign(&app, &admin.token, org_id, desk.id).await.status(), 200);
    // An existing org admin may add more, duplicates included.
    assert_eq!(assign(&app, &desk.token, org_id, helper.id).await.status(), 200);
    assert_eq!(assign(&app, &desk.token, org_id, helper.id).await.status(), 200);

    let body: Value = app
        .client
        .get(app.url(&format!("/organizations/{}/admins", org_id)))
        .bearer_auth(&desk.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let admins = body["data"].as_array().unwrap();
    assert_eq!(admins.len(), 3);
    let link_id = admins[2]["id"].as_i64().unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/organizations/{}/admins/{}", org_id, link_id)))
        .bearer_auth(&desk.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .delete(app.url(&format!("/organizations/{}/admins/{}", org_id, link_id)))
        .bearer_auth(&desk.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = assign(&app, &admin.token, org_id, 999_999).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn org_admin_sees_own_pending_organization() {
    let app = common::spawn_app().await;
    let admin = common::create_test_user(&app, "admin").await;
    common::make_admin(&app.db, admin.id).await;
    let desk = common::create_test_user(&app, "desk").await;

    let org_id = register_org(&app, &desk, "Harbour Ferry").await;
    assert_eq!(assign(&app, &admin.token, org_id, desk.id).await.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/organizations/{}", org_id)))
        .bearer_auth(&desk.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["review_status"], "pending");
}

#[tokio::test]
async fn role_lookups_follow_assignments() {
    use lostfound::models::AppRole;
    use lostfound::services::access::AccessService;

    let app = common::spawn_app().await;
    let admin = common::create_test_user(&app, "admin").await;
    common::make_admin(&app.db, admin.id).await;
    let desk = common::create_test_user(&app, "desk").await;
    let org_id = common::create_active_organization(&app, &desk, &admin).await;

    let access = AccessService::new(app.db.clone());
    assert!(access.has_role(admin.id, AppRole::Admin).await.unwrap());
    assert!(!access.has_role(desk.id, AppRole::Admin).await.unwrap());
    assert!(!access.is_org_admin(desk.id, org_id).await.unwrap());

    assert_eq!(assign(&app, &admin.token, org_id, desk.id).await.status(), 200);
    assert!(access.is_org_admin(desk.id, org_id).await.unwrap());
    assert!(!access.is_org_admin(desk.id, org_id + 1).await.unwrap());
    assert!(!access.is_org_admin(admin.id, org_id).await.unwrap());

    let actor = access.load_actor(desk.id).await.unwrap();
    assert_eq!(actor.org_admin_of, vec![org_id]);
}
