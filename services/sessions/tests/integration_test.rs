use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::{Claims, JwtService};
use foundermentor_common::{ApiResponse, UserRole};
use foundermentor_database::create_pool;
use foundermentor_sessions::config::AppConfig;
use foundermentor_sessions::routes;
use foundermentor_sessions::services::AppState;

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

    async fn seed_active_mentorship(&self, mentor_id: Uuid, mentee_id: Uuid) {
        let (request_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO mentorship_requests (mentor_id, mentee_id, package_type, status)
            VALUES ($1, $2, 'standard', 'accepted')
            RETURNING request_id
            "#,
        )
        .bind(mentor_id)
        .bind(mentee_id)
        .fetch_one(&self.db_pool)
        .await
        .expect("seed request");

        sqlx::query(
            r#"
            INSERT INTO mentorships (request_id, mentor_id, mentee_id, status)
            VALUES ($1, $2, $3, 'active')
            "#,
        )
        .bind(request_id)
        .bind(mentor_id)
        .bind(mentee_id)
        .execute(&self.db_pool)
        .await
        .expect("seed mentorship");
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

#[tokio::test]
async fn schedule_rejects_past_start_times() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (mentee_id, _) = ctx.seed_user(&[UserRole::Mentee]).await;
    ctx.seed_active_mentorship(mentor_id, mentee_id).await;

    let response = ctx
        .server
        .post("/sessions")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({
            "mentee_id": mentee_id,
            "start_time": Utc::now() - Duration::hours(1),
            "duration_minutes": 60,
            "topic": "Retrospective",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_requires_an_active_mentorship() {
    let Some(ctx) = test_context().await else { return };
    let (_, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (mentee_id, _) = ctx.seed_user(&[UserRole::Mentee]).await;

    let response = ctx
        .server
        .post("/sessions")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({
            "mentee_id": mentee_id,
            "start_time": Utc::now() + Duration::days(1),
            "duration_minutes": 60,
            "topic": "Kickoff",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelling_twice_reports_conflict() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (mentee_id, _) = ctx.seed_user(&[UserRole::Mentee]).await;
    ctx.seed_active_mentorship(mentor_id, mentee_id).await;

    let response = ctx
        .server
        .post("/sessions")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({
            "mentee_id": mentee_id,
            "start_time": Utc::now() + Duration::days(1),
            "duration_minutes": 45,
            "topic": "Fundraising prep",
        }))
        .await;
    response.assert_status_ok();

    let body: ApiResponse<serde_json::Value> = response.json();
    let session_id = body.data.expect("session payload")["session_id"]
        .as_str()
        .expect("session id")
        .to_string();

    let cancel_path = format!("/sessions/{}", session_id);
    ctx.server
        .delete(&cancel_path)
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await
        .assert_status_ok();

    let response = ctx
        .server
        .delete(&cancel_path)
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn completed_session_requires_passing_through_in_progress() {
    let Some(ctx) = test_context().await else { return };
    let (mentor_id, mentor_token) = ctx.seed_user(&[UserRole::Mentor]).await;
    let (mentee_id, _) = ctx.seed_user(&[UserRole::Mentee]).await;
    ctx.seed_active_mentorship(mentor_id, mentee_id).await;

    let response = ctx
        .server
        .post("/sessions")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({
            "mentee_id": mentee_id,
            "start_time": Utc::now() + Duration::days(1),
            "duration_minutes": 30,
            "topic": "Pitch review",
        }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<serde_json::Value> = response.json();
    let session_id = body.data.expect("session payload")["session_id"]
        .as_str()
        .expect("session id")
        .to_string();

    let status_path = format!("/sessions/{}/status", session_id);

    // upcoming -> completed skips in_progress and is refused.
    let response = ctx
        .server
        .post(&status_path)
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({ "action": "complete" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    ctx.server
        .post(&status_path)
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({ "action": "start" }))
        .await
        .assert_status_ok();

    ctx.server
        .post(&status_path)
        .add_header(axum::http::header::AUTHORIZATION, bearer(&mentor_token))
        .json(&json!({ "action": "complete" }))
        .await
        .assert_status_ok();
}
