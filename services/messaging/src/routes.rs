use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use foundermentor_auth::{auth_middleware, JwtService};

use crate::handlers;
use crate::services::AppState;

pub fn create_routes(jwt_service: JwtService) -> Router<AppState> {
    let protected = Router::new()
        .route("/messages", post(handlers::send_message))
        .route("/conversations", get(handlers::list_conversations))
        .route(
            "/conversations/:conversation_id/messages",
            get(handlers::list_messages),
        )
        .route_layer(middleware::from_fn_with_state(jwt_service, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}
