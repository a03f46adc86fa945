use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::{Claims, JwtService};
use foundermentor_common::{ApiResponse, UserRole};
use foundermentor_database::create_pool;
use foundermentor_mentorship::config::AppConfig;
use foundermentor_mentorship::routes;
use foundermentor_mentorship::services::AppState;

struct TestContext {
    server: TestServer,
    db_pool: PgPool,
    config: AppConfig,
    jwt_service: JwtService,
}

// Requires a running Postgres and Redis; skipped when the environment
// is not configured.
async fn test_context() -> Option<TestContext> {
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
        db_pool: db_pool.clone(),
        redis_service,
        jwt_service: jwt_service.clone(),
        config: config.clone(),
    };
    let app = routes::create_routes(jwt_service.clone()).with_state(state);

    Some(TestContext {
        server: TestServer::new(app).expect("test server"),
        db_pool,
        config,
        jwt_service,
    })
}

impl TestContext {
    async fn seed_user(&self, roles: &[UserRole]) -> (Uuid, String) {
        let suffix = Uuid::new_v4().simple().to_string();
        let username = format!("user_{}", &suffix[..12]);
        let email = format!("{}@example.com", &suffix[..12]);
        let role_strings: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        let (user_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, roles, hashed_password)
            VALUES ($1, $2, $3, 'not-a-real-hash')
            RETURNING user_id
            "#,
        )
        .bind(&username)
        .bind(&email)
        .bind(&role_strings)
        .fetch_one(&self.db_pool)
        .await
        .expect("seed user");

        let claims = Claims::new(user_id, username, email, roles.to_vec(), &self.config.jwt);
        let token = self.jwt_service.generate_token(&claims).expect("token");

        (user_id, token)
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

#[tokio::test]
async fn second_pending_request_for_same_pair_conflicts() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, _) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (_, mentee_token) = ctx.seed_user(&[UserRole::Mentee]).await;

    let payload = json!({
        "mentor_id": mentor_id,
        "package_type": "standard",
        "goals": "Ship the first prototype",
    });

    ctx.server
        .post("/requests")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&payload)
        .await
        .assert_status_ok();

    let response = ctx
        .server
        .post("/requests")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&payload)
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn accept_creates_mentorship_and_is_not_repeatable() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (_, mentee_token) = ctx.seed_user(&[UserRole::Mentee]).await;

    let response = ctx
        .server
        .post("/requests")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&json!({
            "mentor_id": mentor_id,
            "package_type": "standard",
        }))
        .await;
    response.assert_status_ok();

    let body: ApiResponse<serde_json::Value> = response.json();
    let request_id = body.data.expect("request payload")["request_id"]
        .as_str()
        .expect("request id")
        .to_string();

    let accept_path = format!("/requests/{}/accept", request_id);
    ctx.server
        .post(&accept_path)
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await
        .assert_status_ok();

    // Accepting a request that already left pending reports Conflict.
    let response = ctx
        .server
        .post(&accept_path)
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = ctx
        .server
        .get("/mentorships")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let mentorships = body.data.expect("mentorship list");
    assert!(!mentorships.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn rejected_request_cannot_be_completed() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (_, mentee_token) = ctx.seed_user(&[UserRole::Mentee]).await;

    let response = ctx
        .server
        .post("/requests")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&json!({
            "mentor_id": mentor_id,
            "package_type": "standard",
        }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let request_id = body.data.expect("request payload")["request_id"]
        .as_str()
        .expect("request id")
        .to_string();

    ctx.server
        .post(&format!("/requests/{}/reject", request_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({ "reason": "No capacity this quarter" }))
        .await
        .assert_status_ok();

    let response = ctx
        .server
        .post(&format!("/requests/{}/complete", request_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn completing_a_request_leaves_upcoming_sessions_untouched() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (mentee_id, mentee_token) = ctx.seed_user(&[UserRole::Mentee]).await;

    let response = ctx
        .server
        .post("/requests")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&json!({
            "mentor_id": mentor_id,
            "package_type": "standard",
        }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let request_id = body.data.expect("request payload")["request_id"]
        .as_str()
        .expect("request id")
        .to_string();

    ctx.server
        .post(&format!("/requests/{}/accept", request_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await
        .assert_status_ok();

    let (session_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO sessions (mentor_id, mentee_id, topic, start_time, end_time)
        VALUES ($1, $2, 'Roadmap review', NOW() + INTERVAL '2 days', NOW() + INTERVAL '2 days 1 hour')
        RETURNING session_id
        "#,
    )
    .bind(mentor_id)
    .bind(mentee_id)
    .fetch_one(&ctx.db_pool)
    .await
    .expect("seed session");

    ctx.server
        .post(&format!("/requests/{}/complete", request_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await
        .assert_status_ok();

    // Ending the mentorship does not cancel already-scheduled sessions.
    let (status,): (String,) =
        sqlx::query_as("SELECT status FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(&ctx.db_pool)
            .await
            .expect("session row");
    assert_eq!(status, "upcoming");
}

#[tokio::test]
async fn mentor_review_average_is_reported() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (_, mentee_token) = ctx.seed_user(&[UserRole::Mentee]).await;

    let response = ctx
        .server
        .post("/requests")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&json!({
            "mentor_id": mentor_id,
            "package_type": "standard",
        }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let request_id = body.data.expect("request payload")["request_id"]
        .as_str()
        .expect("request id")
        .to_string();

    ctx.server
        .post(&format!("/requests/{}/accept", request_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await
        .assert_status_ok();

    let response = ctx
        .server
        .get("/mentorships")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let mentorship_id = body.data.expect("mentorship list")[0]["mentorship_id"]
        .as_str()
        .expect("mentorship id")
        .to_string();

    ctx.server
        .post(&format!("/mentorships/{}/reviews", mentorship_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&json!({ "rating": 5, "comment": "Sharp, actionable advice" }))
        .await
        .assert_status_ok();

    let response = ctx
        .server
        .get(&format!("/mentors/{}/reviews", mentor_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let data = body.data.expect("reviews payload");
    assert_eq!(data["total_reviews"].as_i64(), Some(1));
    assert_eq!(data["average_rating"].as_str(), Some("5.00"));
}

#[tokio::test]
async fn review_rating_outside_bounds_is_rejected() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (_, mentee_token) = ctx.seed_user(&[UserRole::Mentee]).await;

    let response = ctx
        .server
        .post("/requests")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&json!({
            "mentor_id": mentor_id,
            "package_type": "standard",
        }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let request_id = body.data.expect("request payload")["request_id"]
        .as_str()
        .expect("request id")
        .to_string();

    ctx.server
        .post(&format!("/requests/{}/accept", request_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await
        .assert_status_ok();

    let response = ctx
        .server
        .get("/mentorships")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let mentorship_id = body.data.expect("mentorship list")[0]["mentorship_id"]
        .as_str()
        .expect("mentorship id")
        .to_string();

    let response = ctx
        .server
        .post(&format!("/mentorships/{}/reviews", mentorship_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentee_token))
        .json(&json!({ "rating": 6, "comment": "off the scale" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
