use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use foundermentor_auth::{auth_middleware, JwtService};

use crate::handlers;
use crate::services::AppState;

pub fn create_routes(jwt_service: JwtService) -> Router<AppState> {
    let protected = Router::new()
        // Mentorship request lifecycle
        .route("/requests", post(handlers::create_request))
        .route("/requests", get(handlers::list_requests))
        .route("/requests/:request_id", get(handlers::get_request))
        .route("/requests/:request_id/accept", post(handlers::accept_request))
        .route("/requests/:request_id/reject", post(handlers::reject_request))
        .route("/requests/:request_id/complete", post(handlers::complete_request))
        .route("/requests/:request_id/schedule", put(handlers::update_schedule))
        // Mentorship relationships
        .route("/mentorships", get(handlers::list_mentorships))
        .route("/mentorships/:mentorship_id", get(handlers::get_mentorship))
        .route("/mentorships/:mentorship_id/reviews", post(handlers::create_review))
        // Mentor views
        .route("/mentors/:mentor_id/mentees", get(handlers::list_mentees))
        .route("/mentors/:mentor_id/reviews", get(handlers::mentor_reviews))
        .route_layer(middleware::from_fn_with_state(jwt_service, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}
