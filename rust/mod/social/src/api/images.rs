use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use perch_core::{new_id, ServiceError};

use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/images", post(upload))
        .route("/images/{*key}", get(serve))
}

/// File extension from an uploaded filename, restricted to short
/// alphanumeric suffixes. Anything else becomes "bin".
fn safe_ext(filename: Option<&str>) -> String {
    filename
        .and_then(|f| f.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

fn content_type(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Accept multipart uploads and return the blob keys, which CreatePost
/// consumes as `image_refs`.
async fn upload(
    State(svc): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let mut keys: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Validation(format!("bad multipart body: {}", e)))?
    {
        let ext = safe_ext(field.file_name());
        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::Validation(format!("bad multipart body: {}", e)))?;
        if data.is_empty() {
            continue;
        }
        let key = format!("images/{}.{}", new_id(), ext);
        svc.blob
            .put(&key, &data)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        keys.push(key);
    }

    if keys.is_empty() {
        return Err(ServiceError::Validation("no files in upload".into()));
    }
    Ok((StatusCode::CREATED, Json(serde_json::json!(keys))))
}

async fn serve(
    State(svc): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let data = svc
        .blob
        .get(&key)
        .map_err(|e| ServiceError::Storage(e.to_string()))?
        .ok_or_else(|| ServiceError::NotFound(format!("image {}", key)))?;

    Ok(([(header::CONTENT_TYPE, content_type(&key))], data))
}

#[cfg(test)]
mod tests {
    use super::{content_type, safe_ext};

    #[test]
    fn ext_is_sanitized() {
        assert_eq!(safe_ext(Some("cat.JPG")), "jpg");
        assert_eq!(safe_ext(Some("archive.tar.gz")), "gz");
        assert_eq!(safe_ext(Some("noext")), "bin");
        assert_eq!(safe_ext(Some("trick../../x")), "bin");
        assert_eq!(safe_ext(None), "bin");
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type("images/a.jpg"), "image/jpeg");
        assert_eq!(content_type("images/a.png"), "image/png");
        assert_eq!(content_type("images/a.bin"), "application/octet-stream");
    }
}
