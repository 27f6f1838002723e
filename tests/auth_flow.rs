use auth_server::auth::routes as auth_routes;
use auth_server::auth::{AuthConfig, AuthError, AuthState, RefreshTokenStore};
use auth_server::test_support::{TestDatabase, TestFixtures, TestRocketBuilder};
use chrono::{Duration, Utc};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use rocket::routes;
use serde_json::{json, Value};

const TEST_SECRET: &str = "an-integration-test-secret-32-bytes";

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.into(),
        jwt_algorithm: "HS256".into(),
        access_token_minutes: 15,
        refresh_token_days: 7,
    }
}

async fn spawn_client(db: &TestDatabase) -> (Client, AuthState) {
    let pool = db.pool_clone();
    let state = AuthState::from_config(test_config(), pool.clone()).expect("auth state");

    let client = TestRocketBuilder::new()
        .mount_api_routes(routes![
            auth_server::routes::health::health_check,
            auth_routes::register,
            auth_routes::login,
            auth_routes::refresh,
            auth_routes::logout,
            auth_routes::me,
        ])
        .manage_pg_pool(pool)
        .manage_auth_state(state.clone())
        .async_client()
        .await;

    (client, state)
}

async fn post_json(client: &Client, uri: &str, body: Value) -> (Status, Value) {
    let response = client
        .post(format!("/api/v1{uri}"))
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch()
        .await;
    let status = response.status();
    let payload = response
        .into_json::<Value>()
        .await
        .unwrap_or_else(|| json!(null));
    (status, payload)
}

#[tokio::test]
async fn full_credential_lifecycle() {
    let db = TestDatabase::new().await.expect("test database");
    let (client, _state) = spawn_client(&db).await;
    let fixtures = TestFixtures::new(db.pool());

    // The pool is wired up.
    let response = client.get("/api/v1/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let health = response.into_json::<Value>().await.expect("json");
    assert_eq!(health["status"], "ok");

    // Register: role auto-created, no tokens issued.
    let (status, body) = post_json(
        &client,
        "/auth/register",
        json!({ "email": "a@x.com", "password": "pw123", "role": "student" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["role"], "student");
    let user_id = body["id"].as_i64().expect("user id") as i32;

    let role_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE name = 'student'")
            .fetch_one(db.pool())
            .await
            .expect("role lookup");
    assert_eq!(role_count, 1);

    // Duplicate email conflicts.
    let (status, _) = post_json(
        &client,
        "/auth/register",
        json!({ "email": "a@x.com", "password": "other", "role": "student" }),
    )
    .await;
    assert_eq!(status, Status::Conflict);

    // Login issues an access/refresh pair and persists one unrevoked record.
    let (status, tokens) = post_json(
        &client,
        "/auth/login",
        json!({ "email": "a@x.com", "password": "pw123" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(tokens["token_type"], "bearer");
    let access = tokens["access_token"].as_str().expect("access").to_string();
    let old_refresh = tokens["refresh_token"]
        .as_str()
        .expect("refresh")
        .to_string();

    assert_eq!(
        fixtures
            .refresh_revocation_states(user_id)
            .await
            .expect("records"),
        vec![false]
    );

    // The access token opens the protected resource.
    let response = client
        .get("/api/v1/me")
        .header(Header::new("Authorization", format!("Bearer {access}")))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let me = response.into_json::<Value>().await.expect("json");
    assert_eq!(me["id"].as_i64(), Some(user_id as i64));
    assert_eq!(me["role"], "student");

    // A refresh token is not an access token.
    let response = client
        .get("/api/v1/me")
        .header(Header::new(
            "Authorization",
            format!("Bearer {old_refresh}"),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // Tampering the payload invalidates the signature.
    let mut tampered: Vec<String> = access.split('.').map(String::from).collect();
    let altered_payload = format!("{}AA", tampered[1]);
    tampered[1] = altered_payload;
    let response = client
        .get("/api/v1/me")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", tampered.join(".")),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // Rotation: new pair returned, old record revoked, new record active.
    let (status, rotated) = post_json(
        &client,
        "/auth/refresh",
        json!({ "refresh_token": old_refresh }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    let new_refresh = rotated["refresh_token"]
        .as_str()
        .expect("refresh")
        .to_string();
    assert_ne!(new_refresh, old_refresh);
    assert_eq!(
        fixtures
            .refresh_revocation_states(user_id)
            .await
            .expect("records"),
        vec![true, false]
    );

    // Replaying the rotated token is rejected with the uniform error.
    let (status, body) = post_json(
        &client,
        "/auth/refresh",
        json!({ "refresh_token": old_refresh }),
    )
    .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["message"], "invalid refresh token");

    // Logout is idempotent and always reports success.
    let (status, body) = post_json(
        &client,
        "/auth/logout",
        json!({ "refresh_token": new_refresh }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["ok"], true);
    assert_eq!(
        fixtures
            .refresh_revocation_states(user_id)
            .await
            .expect("records"),
        vec![true, true]
    );

    let (status, body) = post_json(
        &client,
        "/auth/logout",
        json!({ "refresh_token": new_refresh }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let db = TestDatabase::new().await.expect("test database");
    let (client, _state) = spawn_client(&db).await;

    let (status, _) = post_json(
        &client,
        "/auth/register",
        json!({ "email": "b@x.com", "password": "right-horse", "role": "student" }),
    )
    .await;
    assert_eq!(status, Status::Created);

    let (wrong_pw_status, wrong_pw_body) = post_json(
        &client,
        "/auth/login",
        json!({ "email": "b@x.com", "password": "wrong-horse" }),
    )
    .await;
    let (no_user_status, no_user_body) = post_json(
        &client,
        "/auth/login",
        json!({ "email": "nobody@x.com", "password": "whatever" }),
    )
    .await;

    assert_eq!(wrong_pw_status, Status::Unauthorized);
    assert_eq!(no_user_status, Status::Unauthorized);
    assert_eq!(wrong_pw_body, no_user_body);
}

#[tokio::test]
async fn inactive_users_are_locked_out() {
    let db = TestDatabase::new().await.expect("test database");
    let (client, _state) = spawn_client(&db).await;
    let fixtures = TestFixtures::new(db.pool());

    let (status, body) = post_json(
        &client,
        "/auth/register",
        json!({ "email": "c@x.com", "password": "pw123", "role": "editor" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let user_id = body["id"].as_i64().expect("user id") as i32;

    let (status, tokens) = post_json(
        &client,
        "/auth/login",
        json!({ "email": "c@x.com", "password": "pw123" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    let access = tokens["access_token"].as_str().expect("access").to_string();
    let refresh = tokens["refresh_token"]
        .as_str()
        .expect("refresh")
        .to_string();

    fixtures
        .set_user_active(user_id, false)
        .await
        .expect("deactivate");

    // Login reports the inactive state outright.
    let (status, _) = post_json(
        &client,
        "/auth/login",
        json!({ "email": "c@x.com", "password": "pw123" }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);

    // A still-valid access token no longer opens protected routes.
    let response = client
        .get("/api/v1/me")
        .header(Header::new("Authorization", format!("Bearer {access}")))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // Refresh collapses the inactive-user rejection into the uniform error.
    let (status, body) = post_json(
        &client,
        "/auth/refresh",
        json!({ "refresh_token": refresh }),
    )
    .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["message"], "invalid refresh token");
}

#[tokio::test]
async fn refresh_rejects_unknown_tokens() {
    let db = TestDatabase::new().await.expect("test database");
    let (client, _state) = spawn_client(&db).await;

    let (status, body) = post_json(
        &client,
        "/auth/refresh",
        json!({ "refresh_token": "never-issued" }),
    )
    .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["message"], "invalid refresh token");
}

#[tokio::test]
async fn expired_refresh_tokens_are_rejected() {
    let db = TestDatabase::new().await.expect("test database");
    let (client, _state) = spawn_client(&db).await;

    let (status, body) = post_json(
        &client,
        "/auth/register",
        json!({ "email": "d@x.com", "password": "pw123", "role": "student" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let user_id = body["id"].as_i64().expect("user id") as i32;

    // Record a token whose expiry is already in the past.
    let store = RefreshTokenStore::new(db.pool_clone());
    let mut tx = db.pool().begin().await.expect("tx");
    store
        .record_tx(&mut tx, user_id, "stale-token", Utc::now() - Duration::days(1))
        .await
        .expect("record");
    tx.commit().await.expect("commit");

    // The expired kind collapses into the same uniform rejection.
    let (status, body) = post_json(
        &client,
        "/auth/refresh",
        json!({ "refresh_token": "stale-token" }),
    )
    .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["message"], "invalid refresh token");
}

#[tokio::test]
async fn duplicate_refresh_hashes_conflict() {
    let db = TestDatabase::new().await.expect("test database");
    let fixtures = TestFixtures::new(db.pool());

    let role_id = fixtures.insert_role("student").await.expect("role");
    let user_id = fixtures
        .insert_user("e@x.com", "ab$cd", role_id, true)
        .await
        .expect("user");

    let store = RefreshTokenStore::new(db.pool_clone());
    let expires_at = Utc::now() + Duration::days(7);

    let mut tx = db.pool().begin().await.expect("tx");
    store
        .record_tx(&mut tx, user_id, "reused-token", expires_at)
        .await
        .expect("first record");
    tx.commit().await.expect("commit");

    // Re-recording the same raw token hits the unique hash column and must
    // surface as a conflict, never a silent overwrite.
    let mut tx = db.pool().begin().await.expect("tx");
    let err = store
        .record_tx(&mut tx, user_id, "reused-token", expires_at)
        .await
        .expect_err("duplicate hash must conflict");
    assert!(matches!(err, AuthError::DuplicateToken));
    assert_eq!(err.status(), Status::Conflict);
}
