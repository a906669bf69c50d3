use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use super::jwt;
use super::types::AuthUser;
use crate::error::ApiError;
use crate::AppState;

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Route layer for everything under /api except the auth endpoints. On
/// success the request carries an `AuthUser` extension downstream.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = jwt::validate_access_token(&state.auth, token)?;

    req.extensions_mut().insert(AuthUser { id: claims.sub });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn extracts_bearer_tokens() {
        let req = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_other_schemes_and_missing_headers() {
        let req = request_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&req), None);

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&bare), None);
    }
}
