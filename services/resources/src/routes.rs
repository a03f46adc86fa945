use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use foundermentor_auth::{auth_middleware, JwtService};

use crate::handlers;
use crate::services::AppState;

// Multipart body ceiling; per-file limits are enforced against the
// configured upload size after parsing.
const MAX_UPLOAD_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn create_routes(jwt_service: JwtService) -> Router<AppState> {
    let protected = Router::new()
        .route("/resources", post(handlers::create_resource))
        .route("/resources", get(handlers::list_resources))
        .route(
            "/resources/upload",
            post(handlers::upload_resource).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/resources/shared", get(handlers::list_shared_resources))
        .route("/resources/:resource_id", get(handlers::get_resource))
        .route("/resources/:resource_id", put(handlers::update_resource))
        .route("/resources/:resource_id", delete(handlers::delete_resource))
        .route("/resources/:resource_id/share", post(handlers::share_resource))
        .route_layer(middleware::from_fn_with_state(jwt_service, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}
