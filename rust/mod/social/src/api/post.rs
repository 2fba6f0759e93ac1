use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};

use perch_core::ServiceError;

use crate::api::{Actor, AppState};
use crate::model::{CreateComment, CreatePost};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/post", post(create_post))
        .route("/post/{id}", get(get_post).delete(delete_post))
        .route("/post/{id}/comment", post(create_comment))
        .route("/post/{id}/like", patch(add_like).delete(remove_like))
        .route("/post/{id}/retweet", post(retweet))
}

async fn create_post(
    State(svc): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let view = svc
        .create_post(actor.user_id, input)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!(view))))
}

async fn get_post(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let view = svc.get_post(id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!(view)))
}

/// Deleting a post you don't own (or that doesn't exist) is a silent
/// zero-rows no-op; the response doesn't distinguish the cases.
async fn delete_post(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.delete_post(id, actor.user_id)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"id": id})))
}

async fn create_comment(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<CreateComment>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let comment = svc
        .create_comment(id, actor.user_id, input.content)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!(comment))))
}

async fn add_like(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.add_like(id, actor.user_id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"post_id": id, "user_id": actor.user_id})))
}

async fn remove_like(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.remove_like(id, actor.user_id)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"post_id": id, "user_id": actor.user_id})))
}

async fn retweet(
    State(svc): State<AppState>,
    Path(id): Path<i64>,
    Extension(actor): Extension<Actor>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let view = svc
        .retweet(id, actor.user_id)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!(view))))
}
