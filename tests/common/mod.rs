//! Test helpers for the web API tests.
//!
//! Spins up the full router against an in-memory SQLite database and a
//! local media backend rooted in a temporary directory.

use axum_test::TestServer;
use drive_store::auth::{Claims, TokenVerifier};
use drive_store::handlers::AppState;
use drive_store::routes::routes::routes;
use drive_store::services::drive_service::DriveService;
use drive_store::services::media_service::MediaStore;
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tempfile::TempDir;

/// Signing secret shared by the test server and minted tokens.
pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

/// The schema applied to every in-memory test database.
const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// Mint a bearer token for the given user, valid for an hour.
pub fn bearer_token(user_id: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now as u64,
        exp: (now + 3600) as u64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to mint test token")
}

/// Create a test server backed by an in-memory database and a temp-dir
/// media backend. The TempDir must stay alive for the server's lifetime.
pub async fn test_server() -> (TestServer, TempDir) {
    // A single connection keeps every query on the same :memory: database
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    for stmt in INIT_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(stmt)
            .execute(&db)
            .await
            .expect("Failed to apply schema");
    }

    let media_root = TempDir::new().expect("Failed to create media dir");
    let media = MediaStore::local(media_root.path(), "http://localhost:3000");

    let state = AppState {
        drive: DriveService::new(Arc::new(db), media),
        verifier: TokenVerifier::new(TEST_SECRET),
    };

    let server = TestServer::new(routes().with_state(state)).expect("Failed to create test server");

    (server, media_root)
}
