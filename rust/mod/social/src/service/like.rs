use perch_sql::{SQLExec, Value};

use crate::service::hydrate::post_exists;
use crate::service::{SocialError, SocialService};

impl SocialService {
    /// Add a like edge. Set-union semantics: liking twice leaves one
    /// edge. Fails with NotFound when the post does not exist.
    pub fn add_like(&self, post_id: i64, user_id: i64) -> Result<(), SocialError> {
        if !post_exists(self.sql.as_ref(), post_id)? {
            return Err(SocialError::NotFound(format!("post {}", post_id)));
        }
        self.sql.exec(
            "INSERT OR IGNORE INTO likes (user_id, post_id) VALUES (?1, ?2)",
            &[Value::Integer(user_id), Value::Integer(post_id)],
        )?;
        Ok(())
    }

    /// Remove a like edge. Set-difference semantics: removing an
    /// absent edge is a no-op. Fails with NotFound when the post does
    /// not exist.
    pub fn remove_like(&self, post_id: i64, user_id: i64) -> Result<(), SocialError> {
        if !post_exists(self.sql.as_ref(), post_id)? {
            return Err(SocialError::NotFound(format!("post {}", post_id)));
        }
        self.sql.exec(
            "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
            &[Value::Integer(user_id), Value::Integer(post_id)],
        )?;
        Ok(())
    }
}
