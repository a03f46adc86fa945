use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

use foundermentor_common::ApiResponse;
use foundermentor_database::create_pool;
use foundermentor_user_management::config::AppConfig;
use foundermentor_user_management::models::AuthResponse;
use foundermentor_user_management::routes;
use foundermentor_user_management::services::AppState;

// Requires a running Postgres and Redis; skipped when the environment
// is not configured.
async fn test_server() -> Option<TestServer> {
    if std::env::var("DATABASE_HOST").is_err() || std::env::var("REDIS_HOST").is_err() {
        println!("Skipping integration test - database/redis not configured");
        return None;
    }

    let config = AppConfig::from_env();
    let db_pool = create_pool(&config.database).await.expect("database pool");
    foundermentor_database::run_migrations(&db_pool)
        .await
        .expect("migrations");
    let redis_service = foundermentor_common::RedisService::new(&config.redis)
        .await
        .expect("redis");
    let jwt_service = foundermentor_auth::JwtService::new(&config.jwt.secret);

    let state = AppState {
        db_pool,
        redis_service,
        jwt_service: jwt_service.clone(),
        config,
    };
    let app = routes::create_routes(jwt_service).with_state(state);

    Some(TestServer::new(app).expect("test server"))
}

fn unique_credentials() -> (String, String) {
    let suffix = Uuid::new_v4().simple().to_string();
    (
        format!("user_{}", &suffix[..12]),
        format!("{}@example.com", &suffix[..12]),
    )
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let Some(server) = test_server().await else { return };
    let (username, email) = unique_credentials();

    let response = server
        .post("/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "TestPassword123",
            "roles": ["mentee"],
        }))
        .await;
    response.assert_status_ok();

    let body: ApiResponse<AuthResponse> = response.json();
    assert!(body.success);
    let auth = body.data.expect("auth payload");
    assert_eq!(auth.user.username, username);
    assert_eq!(auth.user.roles, vec!["mentee".to_string()]);
    assert!(!auth.token.is_empty());

    let response = server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": "TestPassword123",
        }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn duplicate_registration_reports_conflict() {
    let Some(server) = test_server().await else { return };
    let (username, email) = unique_credentials();

    let payload = json!({
        "username": username,
        "email": email,
        "password": "TestPassword123",
        "roles": ["mentor"],
    });

    server.post("/auth/register").json(&payload).await.assert_status_ok();

    let response = server.post("/auth/register").json(&payload).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let Some(server) = test_server().await else { return };
    let (username, email) = unique_credentials();

    server
        .post("/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "TestPassword123",
            "roles": ["mentee"],
        }))
        .await
        .assert_status_ok();

    let response = server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": "WrongPassword123",
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let Some(server) = test_server().await else { return };
    let (username, email) = unique_credentials();

    let response = server
        .post("/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "TestPassword123",
            "roles": ["mentee"],
        }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<AuthResponse> = response.json();
    let token = body.data.expect("auth payload").token;

    server.get("/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/auth/me")
        .add_header(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn repeated_login_attempts_are_rate_limited() {
    let Some(server) = test_server().await else { return };
    let (username, email) = unique_credentials();

    server
        .post("/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "TestPassword123",
            "roles": ["mentee"],
        }))
        .await
        .assert_status_ok();

    let limit = AppConfig::from_env().auth_rate_limit;
    let payload = json!({
        "email": email,
        "password": "WrongPassword123",
    });

    for _ in 0..limit {
        let response = server.post("/auth/login").json(&payload).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    // The attempt past the window limit is throttled, not re-checked.
    let response = server.post("/auth/login").json(&payload).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn admin_role_cannot_be_self_assigned() {
    let Some(server) = test_server().await else { return };
    let (username, email) = unique_credentials();

    let response = server
        .post("/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "TestPassword123",
            "roles": ["admin"],
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
