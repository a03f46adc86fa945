use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use foundermentor_common::{AppError, UserRole};

use crate::jwt::{Claims, JwtService};

/// Validates the bearer token and stores the claims in request extensions.
/// Apply per service with `middleware::from_fn_with_state(jwt_service, auth_middleware)`.
pub async fn auth_middleware(
    State(jwt_service): State<JwtService>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_headers(&headers).ok_or_else(|| {
        AppError::Authentication("Missing or invalid authorization header".to_string())
    })?;

    let claims = jwt_service.validate_token(&token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Lets handlers take `claims: Claims` directly. Requires `auth_middleware`
/// to have run on the route.
#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))
    }
}

pub fn require_role(claims: &Claims, role: UserRole) -> Result<(), AppError> {
    if claims.has_role(role) {
        Ok(())
    } else {
        Err(AppError::Authorization(format!(
            "{} role required",
            role.as_str()
        )))
    }
}

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    auth_str
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use foundermentor_common::JwtConfig;
    use uuid::Uuid;

    #[test]
    fn require_role_rejects_missing_role() {
        let config = JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            issuer: "foundermentor-test".to_string(),
        };
        let claims = Claims::new(
            Uuid::new_v4(),
            "ada".to_string(),
            "ada@example.com".to_string(),
            vec![UserRole::Mentee],
            &config,
        );

        assert!(require_role(&claims, UserRole::Mentee).is_ok());
        let err = require_role(&claims, UserRole::Admin).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_token_from_headers(&headers).as_deref(), Some("abc.def"));

        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token_from_headers(&headers), None);

        assert_eq!(extract_token_from_headers(&HeaderMap::new()), None);
    }
}
