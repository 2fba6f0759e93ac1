use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use perch_core::ServiceError;

use crate::api::AppState;

/// Cursor query for feed endpoints: `?lastId=<id of last seen post>`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FeedQuery {
    #[serde(rename = "lastId", default)]
    pub last_id: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/hashtag/{name}", get(hashtag_posts))
}

async fn list_posts(
    State(svc): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let page = svc
        .list_posts(query.last_id, None)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!(page)))
}

async fn hashtag_posts(
    State(svc): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let page = svc
        .list_posts_by_hashtag(&name, query.last_id)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!(page)))
}
