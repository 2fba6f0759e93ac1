use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware::Next, Json};
use serde_json::json;

use crate::api::AppState;

/// The authenticated identity, passed explicitly into every mutation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i64,
    pub session_id: String,
}

/// Bearer-token authentication middleware.
///
/// Reads and the profile/feed surface are public; signup and login are
/// public; everything else needs a valid, unrevoked token. On success
/// an [`Actor`] is stored as a request extension for handlers.
pub async fn auth_middleware(
    State(svc): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_public(req.method(), req.uri().path()) {
        return next.run(req).await;
    }

    let token = match extract_bearer(req.headers()) {
        Some(t) => t.to_string(),
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "missing authorization header"})),
            )
                .into_response();
        }
    };

    match svc.verify_token(&token) {
        Ok(claims) => {
            let user_id = match claims.sub.parse::<i64>() {
                Ok(id) => id,
                Err(_) => {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"error": "malformed token subject"})),
                    )
                        .into_response();
                }
            };
            req.extensions_mut().insert(Actor {
                user_id,
                session_id: claims.sid,
            });
            next.run(req).await
        }
        Err(e) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Check whether a request needs no authentication.
fn is_public(method: &Method, path: &str) -> bool {
    match *method {
        Method::GET => {
            path.starts_with("/posts")
                || path.starts_with("/post/")
                || path.starts_with("/images/")
                || path.starts_with("/hashtag/")
                || (path.starts_with("/user/") && path != "/user/me")
        }
        Method::POST => path == "/user" || path == "/user/login",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::is_public;
    use axum::http::Method;

    #[test]
    fn reads_are_public() {
        assert!(is_public(&Method::GET, "/posts"));
        assert!(is_public(&Method::GET, "/post/3"));
        assert!(is_public(&Method::GET, "/user/3/posts"));
        assert!(is_public(&Method::GET, "/images/images/abc.jpg"));
    }

    #[test]
    fn signup_and_login_are_public() {
        assert!(is_public(&Method::POST, "/user"));
        assert!(is_public(&Method::POST, "/user/login"));
    }

    #[test]
    fn mutations_and_me_need_auth() {
        assert!(!is_public(&Method::POST, "/post"));
        assert!(!is_public(&Method::PATCH, "/post/3/like"));
        assert!(!is_public(&Method::DELETE, "/user/3/follow"));
        assert!(!is_public(&Method::GET, "/user/me"));
        assert!(!is_public(&Method::POST, "/user/logout"));
    }
}
