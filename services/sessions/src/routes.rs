use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use foundermentor_auth::{auth_middleware, JwtService};

use crate::handlers;
use crate::services::AppState;

pub fn create_routes(jwt_service: JwtService) -> Router<AppState> {
    let protected = Router::new()
        // Session lifecycle
        .route("/sessions", post(handlers::schedule_session))
        .route("/sessions/:session_id", get(handlers::get_session))
        .route("/sessions/:session_id", put(handlers::reschedule_session))
        .route("/sessions/:session_id", delete(handlers::cancel_session))
        .route("/sessions/:session_id/status", post(handlers::session_action))
        .route("/sessions/:session_id/resources", post(handlers::attach_resources))
        // Participant views
        .route("/mentors/:mentor_id/sessions", get(handlers::mentor_sessions))
        .route("/mentees/:mentee_id/sessions", get(handlers::mentee_sessions))
        .route_layer(middleware::from_fn_with_state(jwt_service, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}
