use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Extension, Json, Router};

use perch_core::ServiceError;

use crate::api::posts::FeedQuery;
use crate::api::{Actor, AppState};
use crate::model::{Credentials, Signup};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user", post(signup))
        .route("/user/login", post(login))
        .route("/user/logout", post(logout))
        .route("/user/me", get(me))
        .route("/user/{id}", get(profile))
        .route("/user/{id}/posts", get(user_posts))
        .route("/user/{id}/follow", patch(follow).delete(unfollow))
        .route("/user/follower/{id}", delete(remove_follower))
}

async fn signup(
    State(svc): State<AppState>,
    Json(input): Json<Signup>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let profile = svc.signup(input).map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!(profile))))
}

async fn login(
    State(svc): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = svc
        .verify_credentials(&creds.email, &creds.password)
        .map_err(ServiceError::from)?
        .map_err(|rejection| ServiceError::Unauthorized(rejection.to_string()))?;

    let token = svc.issue_token(user.id).map_err(ServiceError::from)?;
    let account = svc.account_view(user.id).map_err(ServiceError::from)?;

    Ok(Json(serde_json::json!({
        "user": account,
        "access_token": token.access_token,
        "token_type": token.token_type,
        "expires_in": token.expires_in,
    })))
}

async fn logout(
    State(svc): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.logout(&actor.session_id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn me(
    State(svc): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let account = svc.account_view(actor.user_id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!(account)))
}

async fn profile(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let view = svc.profile_view(id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!(view)))
}

async fn user_posts(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let page = svc
        .list_posts(query.last_id, Some(id))
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!(page)))
}

async fn follow(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.follow(id, actor.user_id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"user_id": id})))
}

async fn unfollow(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.unfollow(id, actor.user_id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"user_id": id})))
}

async fn remove_follower(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.remove_follower(id, actor.user_id)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"user_id": id})))
}
