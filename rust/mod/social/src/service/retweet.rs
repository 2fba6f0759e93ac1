use perch_core::now_rfc3339;
use perch_sql::{SQLExec, Value};

use crate::model::PostView;
use crate::service::hydrate::post_from_row;
use crate::service::{SocialError, SocialService};

/// Content stored on retweet rows. The hydrated original carries the
/// real content.
const RETWEET_PLACEHOLDER: &str = "retweet";

impl SocialService {
    /// Retweet a post.
    ///
    /// The target is normalized to its root original at creation time:
    /// retweeting a retweet stores the root's id, so hydration never
    /// unwinds more than one hop. Forbidden when the actor authored
    /// the post (or the root original), or already retweeted the root.
    /// The check-then-insert runs inside one transaction, which
    /// serializes concurrent duplicate attempts on the single writer.
    pub fn retweet(&self, post_id: i64, actor_id: i64) -> Result<PostView, SocialError> {
        let now = now_rfc3339();

        let new_id = self.with_tx(|tx| {
            let rows = tx.query(
                "SELECT id, content, author_id, retweet_of_id, created_at
                 FROM posts WHERE id = ?1",
                &[Value::Integer(post_id)],
            )?;
            let post = match rows.first() {
                Some(row) => post_from_row(row)?,
                None => return Err(SocialError::NotFound(format!("post {}", post_id))),
            };

            if post.author_id == actor_id {
                return Err(SocialError::Forbidden("cannot retweet your own post".into()));
            }

            let root_id = post.retweet_of_id.unwrap_or(post.id);
            if let Some(root) = post.retweet_of_id {
                let root_rows = tx.query(
                    "SELECT author_id FROM posts WHERE id = ?1",
                    &[Value::Integer(root)],
                )?;
                let root_author = root_rows
                    .first()
                    .and_then(|r| r.get_i64("author_id"))
                    .ok_or_else(|| SocialError::NotFound(format!("post {}", root)))?;
                if root_author == actor_id {
                    return Err(SocialError::Forbidden("cannot retweet your own post".into()));
                }
            }

            let existing = tx.query(
                "SELECT id FROM posts WHERE author_id = ?1 AND retweet_of_id = ?2",
                &[Value::Integer(actor_id), Value::Integer(root_id)],
            )?;
            if !existing.is_empty() {
                return Err(SocialError::Forbidden("already retweeted".into()));
            }

            let id = tx.insert(
                "INSERT INTO posts (content, author_id, retweet_of_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(RETWEET_PLACEHOLDER.to_string()),
                    Value::Integer(actor_id),
                    Value::Integer(root_id),
                    Value::Text(now.clone()),
                ],
            )?;
            Ok(id)
        })?;

        self.get_post(new_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::CreatePost;
    use crate::service::testutil::{signup, test_service};
    use crate::service::SocialError;

    #[test]
    fn retweet_of_retweet_points_at_root() {
        let (_dir, svc) = test_service();
        let x = signup(&svc, "x@example.com", "x");
        let y = signup(&svc, "y@example.com", "y");
        let z = signup(&svc, "z@example.com", "z");

        let a = svc
            .create_post(x, CreatePost { content: "original".into(), image_refs: vec![] })
            .unwrap();
        let b = svc.retweet(a.id, y).unwrap();
        assert_eq!(b.retweet_of_id, Some(a.id));

        let c = svc.retweet(b.id, z).unwrap();
        assert_eq!(c.retweet_of_id, Some(a.id));
        assert_eq!(c.retweet.as_ref().unwrap().id, a.id);
        assert_eq!(c.retweet.as_ref().unwrap().content, "original");
    }

    #[test]
    fn own_post_and_own_root_are_forbidden() {
        let (_dir, svc) = test_service();
        let x = signup(&svc, "x@example.com", "x");
        let y = signup(&svc, "y@example.com", "y");

        let a = svc
            .create_post(x, CreatePost { content: "mine".into(), image_refs: vec![] })
            .unwrap();
        assert!(matches!(svc.retweet(a.id, x), Err(SocialError::Forbidden(_))));

        // y retweets x's post; x still cannot retweet the retweet.
        let b = svc.retweet(a.id, y).unwrap();
        assert!(matches!(svc.retweet(b.id, x), Err(SocialError::Forbidden(_))));
    }

    #[test]
    fn duplicate_retweet_is_forbidden() {
        let (_dir, svc) = test_service();
        let x = signup(&svc, "x@example.com", "x");
        let y = signup(&svc, "y@example.com", "y");
        let z = signup(&svc, "z@example.com", "z");

        let a = svc
            .create_post(x, CreatePost { content: "once".into(), image_refs: vec![] })
            .unwrap();
        let b = svc.retweet(a.id, y).unwrap();
        assert!(matches!(svc.retweet(a.id, y), Err(SocialError::Forbidden(_))));

        // Retweeting the original after retweeting the retweet also
        // collides on the root id.
        svc.retweet(b.id, z).unwrap();
        assert!(matches!(svc.retweet(a.id, z), Err(SocialError::Forbidden(_))));
    }

    #[test]
    fn retweet_missing_post_is_not_found() {
        let (_dir, svc) = test_service();
        let x = signup(&svc, "x@example.com", "x");
        assert!(matches!(svc.retweet(404, x), Err(SocialError::NotFound(_))));
    }

    #[test]
    fn retweet_appears_in_feed_with_original_nested() {
        let (_dir, svc) = test_service();
        let x = signup(&svc, "x@example.com", "x");
        let y = signup(&svc, "y@example.com", "y");
        let a = svc
            .create_post(x, CreatePost { content: "original #tag".into(), image_refs: vec![] })
            .unwrap();
        svc.retweet(a.id, y).unwrap();

        let feed = svc.list_posts(None, None).unwrap();
        assert_eq!(feed.len(), 2);
        // Newest first: the retweet leads.
        let rt = &feed[0];
        assert_eq!(rt.user.id, y);
        let nested = rt.retweet.as_ref().unwrap();
        assert_eq!(nested.id, a.id);
        assert_eq!(nested.user.id, x);
    }
}
