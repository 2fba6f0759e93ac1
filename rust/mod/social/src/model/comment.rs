use serde::{Deserialize, Serialize};

use crate::model::Profile;

/// A comment with its author projection.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub created_at: String,
    pub user: Profile,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub content: String,
}
