use perch_core::now_rfc3339;
use perch_sql::{SQLExec, Value};

use crate::model::{CommentView, Profile};
use crate::service::hydrate::post_exists;
use crate::service::{SocialError, SocialService};

impl SocialService {
    /// Create a comment on a post. Fails with NotFound when the post
    /// does not exist; returns the hydrated comment with its author.
    pub fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        content: String,
    ) -> Result<CommentView, SocialError> {
        if content.trim().is_empty() {
            return Err(SocialError::Validation("comment content is empty".into()));
        }
        let now = now_rfc3339();

        let comment_id = self.with_tx(|tx| {
            if !post_exists(tx, post_id)? {
                return Err(SocialError::NotFound(format!("post {}", post_id)));
            }
            let id = tx.insert(
                "INSERT INTO comments (content, post_id, author_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(content.clone()),
                    Value::Integer(post_id),
                    Value::Integer(author_id),
                    Value::Text(now.clone()),
                ],
            )?;
            Ok(id)
        })?;

        let author = self
            .fetch_profiles(&[author_id])?
            .remove(&author_id)
            .ok_or_else(|| SocialError::Internal(format!("author {} missing", author_id)))?;

        Ok(CommentView {
            id: comment_id,
            content,
            post_id,
            created_at: now,
            user: Profile {
                id: author.id,
                nickname: author.nickname,
            },
        })
    }
}
