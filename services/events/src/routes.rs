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
        .route("/events", post(handlers::create_event))
        .route("/events", get(handlers::list_events))
        .route("/events/:event_id", get(handlers::get_event))
        .route("/events/:event_id", put(handlers::update_event))
        .route("/events/:event_id/register", post(handlers::register))
        .route("/events/:event_id/register", delete(handlers::unregister))
        .route("/events/:event_id/registrations", get(handlers::list_registrations))
        .route_layer(middleware::from_fn_with_state(jwt_service, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}
