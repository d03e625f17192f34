use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::api::AppState;
use crate::errors::AppError;
use crate::services::jwt::CurrentUser;

/// Cookie carrying the admin session token.
pub const ADMIN_COOKIE: &str = "ADMIN_JWT";

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == ADMIN_COOKIE).then(|| value.to_string())
    })
}

/// Locates a token candidate (Authorization header first, then the admin
/// cookie) and either attaches the validated identity to the request or
/// rejects it outright. A request without any token proceeds anonymously;
/// a request carrying a malformed or expired token is always rejected,
/// since that signals a stale client or an attacker rather than a visitor.
pub async fn auth_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).or_else(|| cookie_token(request.headers()));

    if let Some(token) = token {
        let claims = match state.jwt.decode(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(action = "token_rejected", error = %e);
                return e.into_response();
            }
        };
        if !state.jwt.is_live(&claims) {
            warn!(action = "token_expired", user = %claims.username);
            return AppError::AuthenticationFailure("Token has expired".to_string())
                .into_response();
        }

        match CurrentUser::from_claims(claims, token) {
            Ok(user) => {
                debug!(action = "request_authenticated", user = %user.username, role = %user.role);
                request.extensions_mut().insert(user);
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(request).await
}

/// Route-group guard: any authenticated identity (ADMIN or CUSTOMER).
pub async fn require_authenticated(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentUser>().is_none() {
        return AppError::AuthenticationFailure("Authentication required".to_string())
            .into_response();
    }
    next.run(request).await
}

/// Route-group guard: ADMIN only. Evaluated after the gate, so a present
/// identity with the wrong role is an authorization failure, not an
/// authentication one.
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<CurrentUser>() {
        None => AppError::AuthenticationFailure("Authentication required".to_string())
            .into_response(),
        Some(user) if user.is_admin() => next.run(request).await,
        Some(user) => {
            warn!(action = "admin_route_denied", user = %user.username, role = %user.role);
            AppError::AuthorizationFailure("Only ADMIN can access this endpoint".to_string())
                .into_response()
        }
    }
}

/// Opens a per-request span carrying a generated request id.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri()
    );
    next.run(request).instrument(span).await
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::AuthenticationFailure("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert(
            COOKIE,
            HeaderValue::from_static("ADMIN_JWT=cookie-token; other=1"),
        );

        let token = bearer_token(&headers).or_else(|| cookie_token(&headers));
        assert_eq!(token.as_deref(), Some("header-token"));
    }

    #[test]
    fn cookie_is_used_when_no_header_present() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; ADMIN_JWT=cookie-token"),
        );
        assert_eq!(cookie_token(&headers).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn no_candidate_when_header_is_not_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());
        assert!(cookie_token(&headers).is_none());
    }
}
