//! Shared fixtures for the test suite.
//!
//! Tests run against an in-memory SQLite database. The pool is capped at one
//! connection so every query sees the same in-memory instance; migrations run
//! at pool creation.

use crate::{
    AppState, Config, build_router,
    api::models::users::CurrentUser,
    auth::{password, session},
    types::{UserId, VesselId},
};
use axum::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
use axum_test::TestServer;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool, sqlite::SqlitePoolOptions};
use uuid::Uuid;

/// A user created for tests, with a ready-to-use session token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub email: String,
    pub token: String,
}

/// Config with a fixed secret so tokens verify across helpers
pub fn create_test_config() -> Config {
    Config {
        secret_key: Some("test-secret-key".to_string()),
        ..Default::default()
    }
}

/// In-memory pool with migrations applied.
///
/// One connection, never recycled: an in-memory SQLite database lives and
/// dies with its connection.
pub async fn create_test_pool() -> SqlitePool {
    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to create test pool");

    crate::migrator().run(&pool).await.expect("Failed to run migrations");
    pool
}

/// Test server over a fresh database, plus the pool for direct fixtures
pub async fn create_test_app() -> (TestServer, SqlitePool) {
    let pool = create_test_pool().await;
    let state = AppState::builder()
        .db(pool.clone())
        .config(create_test_config())
        .build();
    let router = build_router(state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");
    (server, pool)
}

fn issue_token(id: UserId, email: &str, is_admin: bool) -> String {
    let current_user = CurrentUser {
        id,
        name: "Test User".to_string(),
        email: email.to_string(),
        is_admin,
    };
    session::create_session_token(&current_user, &create_test_config()).expect("Failed to create token")
}

/// Insert a user directly and mint a session token for them
pub async fn create_test_user(pool: &SqlitePool, email: &str, is_admin: bool) -> TestUser {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let id = insert_test_user(&mut conn, email, is_admin).await;
    TestUser {
        id,
        email: email.to_string(),
        token: issue_token(id, email, is_admin),
    }
}

/// Insert a user with a real password hash (for login-flow tests)
pub async fn create_test_user_with_password(
    pool: &SqlitePool,
    email: &str,
    plain_password: &str,
    is_admin: bool,
) -> TestUser {
    let hash = password::hash_string(plain_password).expect("Failed to hash password");
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, phone, is_admin, active, password_hash, created_at, updated_at)
         VALUES (?, 'Test User', ?, NULL, ?, 1, ?, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind(is_admin)
    .bind(hash)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .expect("Failed to insert user");

    TestUser {
        id,
        email: email.to_string(),
        token: issue_token(id, email, is_admin),
    }
}

/// Bearer auth header for a test user
pub fn auth_header(user: &TestUser) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", user.token)).expect("Invalid header value"),
    )
}

/// Raw insert helpers for repository-level tests

pub async fn insert_test_user(conn: &mut SqliteConnection, email: &str, is_admin: bool) -> UserId {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, phone, is_admin, active, password_hash, created_at, updated_at)
         VALUES (?, 'Test User', ?, NULL, ?, 1, NULL, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind(is_admin)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .expect("Failed to insert user");
    id
}

pub async fn insert_test_vessel(conn: &mut SqliteConnection) -> VesselId {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO vessels (id, name, registration_number, home_port, vessel_type, created_at, updated_at)
         VALUES (?, 'Test Vessel', NULL, NULL, NULL, ?, ?)",
    )
    .bind(id)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .expect("Failed to insert vessel");
    sqlx::query(
        "INSERT INTO vessel_settings (vessel_id, currency, default_vat_rate_bp, default_profile_id, updated_at)
         VALUES (?, 'EUR', 0, NULL, ?)",
    )
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .expect("Failed to insert vessel settings");
    id
}

pub async fn insert_test_account(conn: &mut SqliteConnection, vessel_id: VesselId) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO bank_accounts (id, vessel_id, name, iban, opening_balance_cents, created_at, updated_at)
         VALUES (?, ?, ?, NULL, 0, ?, ?)",
    )
    .bind(id)
    .bind(vessel_id)
    .bind(format!("Account {}", &id.to_string()[..8]))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .expect("Failed to insert account");
    id
}

/// HTTP-level fixtures (exercise the real handlers)

pub async fn create_test_vessel(app: &TestServer, owner: &TestUser) -> VesselId {
    let (name, value) = auth_header(owner);
    let response = app
        .post("/api/v1/vessels")
        .add_header(name, value)
        .json(&serde_json::json!({ "name": "Test Vessel" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let vessel: crate::api::models::vessels::VesselResponse = response.json();
    vessel.id
}

pub async fn create_test_account_http(app: &TestServer, user: &TestUser, vessel_id: VesselId) -> Uuid {
    let (name, value) = auth_header(user);
    let response = app
        .post(&format!("/api/v1/vessels/{vessel_id}/accounts"))
        .add_header(name, value)
        .json(&serde_json::json!({ "name": format!("Account {}", Uuid::new_v4()) }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let account: crate::api::models::bank_accounts::AccountResponse = response.json();
    account.id
}

pub async fn add_member(
    app: &TestServer,
    acting: &TestUser,
    vessel_id: VesselId,
    user: &TestUser,
    role: &str,
) {
    let (name, value) = auth_header(acting);
    app.post(&format!("/api/v1/vessels/{vessel_id}/members"))
        .add_header(name, value)
        .json(&serde_json::json!({ "user_id": user.id, "role": role }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
}
