use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use foundermentor_auth::{auth_middleware, JwtService};

use crate::handlers;
use crate::services::AppState;

// Avatar uploads are capped at 5 MB; the body limit leaves headroom for
// the multipart framing.
const MAX_UPLOAD_BODY_BYTES: usize = 6 * 1024 * 1024;

pub fn create_routes(jwt_service: JwtService) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        // Profiles
        .route("/profiles/:user_id", get(handlers::get_profile))
        .route("/profiles", put(handlers::update_profile))
        .route(
            "/profiles/avatar",
            post(handlers::upload_avatar).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        // Admin
        .route("/admin/users", get(handlers::list_users))
        .route("/admin/users/:user_id/verify", post(handlers::verify_mentor))
        .route("/admin/users/:user_id/roles", post(handlers::add_role))
        .route("/admin/users/:user_id/roles/:role", delete(handlers::remove_role))
        .route_layer(middleware::from_fn_with_state(jwt_service, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .merge(protected)
}
