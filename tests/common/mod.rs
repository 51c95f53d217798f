#![allow(dead_code)]

use async_trait::async_trait;
use lostfound::config::WorkflowConfig;
use lostfound::error::{AppError, AppResult};
use lostfound::events::{ChangeFeed, CounterUpdater};
use lostfound::services::sms::{SharedSms, SmsDispatcher, SmsRequest, SmsResponse};
use lostfound::services::upload::{LocalStorage, ObjectStorage, SharedStorage, UploadConfig};
use reqwest::Client;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Once, OnceLock,
};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, OnceCell, OwnedMutexGuard};

static INIT: Once = Once::new();
static MIGRATED: OnceCell<()> = OnceCell::const_new();
static DB_LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const PASSWORD: &str = "test_password_123";
pub const TEST_UPLOAD_DIR: &str = "./test_uploads";

/// Smallest byte sequence that passes the PNG signature check.
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = lostfound::config::JwtConfig::from_env().unwrap();
        let _ = lostfound::utils::jwt::init_jwt_config(config);
    });
}

fn database_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"))
}

/// Records every SMS instead of sending it. When `delivers` is false every
/// send reports failure, like a gateway that is down.
pub struct RecordingDispatcher {
    tx: mpsc::UnboundedSender<SmsRequest>,
    delivers: bool,
}

#[async_trait]
impl SmsDispatcher for RecordingDispatcher {
    async fn send(&self, request: SmsRequest) -> SmsResponse {
        let _ = self.tx.send(request);
        if self.delivers {
            SmsResponse::sent(Some("SM_test".to_string()))
        } else {
            SmsResponse::failed()
        }
    }
}

/// Storage whose writes always fail.
pub struct FailingStorage;

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn put(&self, key: &str, _data: &[u8]) -> AppResult<String> {
        Err(AppError::Storage(format!("bucket unavailable for {}", key)))
    }
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
    pub feed: ChangeFeed,
    pub sms: mpsc::UnboundedReceiver<SmsRequest>,
    _guard: OwnedMutexGuard<()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    /// Number of files stored under an upload subdirectory such as `proofs`.
    pub fn stored_files(&self, subdirectory: &str) -> usize {
        std::fs::read_dir(std::path::Path::new(TEST_UPLOAD_DIR).join(subdirectory))
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0)
    }

    pub fn ws_url(&self, query: &str) -> String {
        format!("{}/ws?{}", self.addr.replacen("http", "ws", 1), query)
    }

    /// Wait for the next recorded SMS.
    pub async fn next_sms(&mut self) -> Option<SmsRequest> {
        tokio::time::timeout(Duration::from_secs(5), self.sms.recv())
            .await
            .ok()
            .flatten()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(None, true).await
}

/// Spawn the app with object storage that rejects every write.
pub async fn spawn_app_with_failing_storage() -> TestApp {
    spawn_app_with(Some(Arc::new(FailingStorage)), true).await
}

/// Spawn the app with an SMS gateway that never delivers.
pub async fn spawn_app_with_failing_sms() -> TestApp {
    spawn_app_with(None, false).await
}

async fn spawn_app_with(storage: Option<SharedStorage>, sms_delivers: bool) -> TestApp {
    init_env();

    // Tests share one database and truncate it, so they run one at a time.
    let guard = DB_LOCK
        .get_or_init(|| Arc::new(Mutex::new(())))
        .clone()
        .lock_owned()
        .await;

    MIGRATED
        .get_or_init(|| async {
            let db = sea_orm::Database::connect(&database_url())
                .await
                .expect("Failed to connect to test database");
            lostfound::migration::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
        })
        .await;

    let db = sea_orm::Database::connect(&database_url())
        .await
        .expect("Failed to connect to test database");
    cleanup_tables(&db).await;

    let feed = ChangeFeed::new();
    CounterUpdater::new(db.clone(), feed.clone()).spawn();

    let (tx, sms) = mpsc::unbounded_channel();
    let dispatcher: SharedSms = Arc::new(RecordingDispatcher {
        tx,
        delivers: sms_delivers,
    });
    let storage = storage.unwrap_or_else(|| {
        Arc::new(LocalStorage::new(&UploadConfig {
            upload_dir: TEST_UPLOAD_DIR.to_string(),
        }))
    });

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(lostfound::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(feed.clone()))
        .layer(axum::extract::Extension(storage))
        .layer(axum::extract::Extension(dispatcher))
        .layer(axum::extract::Extension(WorkflowConfig::default()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
        feed,
        sms,
        _guard: guard,
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    let tables = [
        "verification_requests",
        "items",
        "organization_admins",
        "organizations",
        "user_roles",
        "profiles",
        "users",
    ];

    for table in tables {
        let sql = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", table);
        db.execute(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            sql,
        ))
        .await
        .unwrap_or_else(|e| panic!("Failed to truncate {}: {}", table, e));
    }
}

pub struct TestUser {
    pub id: i32,
    pub token: String,
    pub email: String,
}

/// Register a user and return its id and token.
pub async fn create_test_user(app: &TestApp, prefix: &str) -> TestUser {
    create_test_user_with_phone(app, prefix, None).await
}

pub async fn create_test_user_with_phone(
    app: &TestApp,
    prefix: &str,
    phone: Option<&str>,
) -> TestUser {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let email = format!("{}_{}@test.com", prefix, counter);

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&serde_json::json!({
            "email": email,
            "password": PASSWORD,
            "full_name": format!("{} {}", prefix, counter),
            "phone": phone,
        }))
        .send()
        .await
        .expect("Failed to register user");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse register response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to register '{}': status={}, body={}", email, status, body);
    }

    TestUser {
        id: body["data"]["user_id"].as_i64().expect("missing user_id") as i32,
        token: body["data"]["token"]
            .as_str()
            .expect("missing token")
            .to_string(),
        email,
    }
}

/// Grant the platform admin role directly in the database.
pub async fn make_admin(db: &DatabaseConnection, user_id: i32) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "INSERT INTO user_roles (user_id, role, created_at) VALUES ($1, 'admin', NOW()) \
         ON CONFLICT DO NOTHING",
        vec![user_id.into()],
    ))
    .await
    .expect("Failed to make user admin");
}

pub fn item_payload(title: &str, organization_id: Option<i32>) -> Value {
    serde_json::json!({
        "title": title,
        "description": "Found near the ticket counter",
        "category": "electronics",
        "city": "Mumbai",
        "area": "Andheri",
        "specific_location": "Platform 3",
        "date_found": "2024-03-01",
        "image_urls": [],
        "organization_id": organization_id,
    })
}

/// Post an item as `finder` and return its id.
pub async fn create_test_item(
    app: &TestApp,
    finder: &TestUser,
    title: &str,
    organization_id: Option<i32>,
) -> i32 {
    let resp = app
        .client
        .post(app.url("/items"))
        .bearer_auth(&finder.token)
        .json(&item_payload(title, organization_id))
        .send()
        .await
        .expect("Failed to create item");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse item response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to create item: status={}, body={}", status, body);
    }
    body["data"]["id"].as_i64().expect("missing item id") as i32
}

/// Submit a JSON claim and return the request id.
pub async fn submit_claim(app: &TestApp, claimant: &TestUser, item_id: i32) -> i32 {
    let resp = app
        .client
        .post(app.url(&format!("/items/{}/claims", item_id)))
        .bearer_auth(&claimant.token)
        .json(&serde_json::json!({
            "identification_marks": "Scratch on the back cover",
            "security_answers": {"purchaseDate": "2023-12-24"},
            "claimant_phone": "+15550001111",
        }))
        .send()
        .await
        .expect("Failed to submit claim");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse claim response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to submit claim: status={}, body={}", status, body);
    }
    body["data"]["id"].as_i64().expect("missing request id") as i32
}

pub async fn decide(app: &TestApp, token: &str, request_id: i32, decision: &str) -> reqwest::Response {
    app.client
        .put(app.url(&format!("/claims/{}/decision", request_id)))
        .bearer_auth(token)
        .json(&serde_json::json!({"decision": decision, "notes": "checked receipt"}))
        .send()
        .await
        .expect("Failed to send decision")
}

/// Register an organization, approve it as `admin`, and return its id.
pub async fn create_active_organization(app: &TestApp, owner: &TestUser, admin: &TestUser) -> i32 {
    let resp = app
        .client
        .post(app.url("/organizations"))
        .bearer_auth(&owner.token)
        .json(&organization_payload("Central Station"))
        .send()
        .await
        .expect("Failed to register organization");
    let body: Value = resp.json().await.expect("Failed to parse organization response");
    let org_id = body["data"]["id"].as_i64().expect("missing organization id") as i32;

    let resp = app
        .client
        .put(app.url(&format!("/admin/organizations/{}/approve", org_id)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .expect("Failed to approve organization");
    assert_eq!(resp.status(), 200);
    org_id
}

pub fn organization_payload(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "org_type": "transit",
        "address": "1 Station Road",
        "city": "Mumbai",
        "contact_email": "desk@station.test",
        "contact_phone": "+15550009999",
    })
}

/// Poll until `check` passes or a few seconds elapse; counters are updated asynchronously.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
