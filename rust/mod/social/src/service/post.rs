use perch_core::now_rfc3339;
use perch_sql::{SQLExec, Value};

use crate::model::{CreatePost, PostView};
use crate::service::hashtag::{extract_hashtags, find_or_create_hashtag};
use crate::service::{SocialError, SocialService};

impl SocialService {
    /// Create a post: row, hashtag links, and image links in one
    /// transaction. Nothing persists if any step fails.
    pub fn create_post(&self, author_id: i64, input: CreatePost) -> Result<PostView, SocialError> {
        if input.content.trim().is_empty() {
            return Err(SocialError::Validation("post content is empty".into()));
        }
        let tags = extract_hashtags(&input.content);
        let now = now_rfc3339();

        let post_id = self.with_tx(|tx| {
            let post_id = tx.insert(
                "INSERT INTO posts (content, author_id, retweet_of_id, created_at)
                 VALUES (?1, ?2, NULL, ?3)",
                &[
                    Value::Text(input.content.clone()),
                    Value::Integer(author_id),
                    Value::Text(now.clone()),
                ],
            )?;

            for tag in &tags {
                let tag_id = find_or_create_hashtag(tx, tag)?;
                tx.exec(
                    "INSERT OR IGNORE INTO post_hashtags (post_id, hashtag_id) VALUES (?1, ?2)",
                    &[Value::Integer(post_id), Value::Integer(tag_id)],
                )?;
            }

            for src in &input.image_refs {
                tx.insert(
                    "INSERT INTO images (src, post_id) VALUES (?1, ?2)",
                    &[Value::Text(src.clone()), Value::Integer(post_id)],
                )?;
            }

            Ok(post_id)
        })?;

        self.get_post(post_id)
    }

    /// Delete a post, but only when `actor_id` is its author.
    ///
    /// A non-owned or nonexistent post is a zero-rows no-op — the data
    /// layer does not distinguish the two cases. Returns the affected
    /// row count. Child rows go with the post (FK cascade); image
    /// blobs are removed best-effort after commit.
    pub fn delete_post(&self, post_id: i64, actor_id: i64) -> Result<u64, SocialError> {
        let (affected, srcs) = self.with_tx(|tx| {
            let rows = tx.query(
                "SELECT src FROM images WHERE post_id IN (
                     SELECT id FROM posts WHERE id = ?1 AND author_id = ?2
                 )",
                &[Value::Integer(post_id), Value::Integer(actor_id)],
            )?;
            let srcs: Vec<String> = rows
                .iter()
                .filter_map(|r| r.get_str("src").map(|s| s.to_string()))
                .collect();

            let affected = tx.exec(
                "DELETE FROM posts WHERE id = ?1 AND author_id = ?2",
                &[Value::Integer(post_id), Value::Integer(actor_id)],
            )?;
            Ok((affected, srcs))
        })?;

        if affected > 0 {
            for src in &srcs {
                if let Err(e) = self.blob.delete(src) {
                    tracing::warn!("failed to delete image blob {}: {}", src, e);
                }
            }
        }
        Ok(affected)
    }

    /// Posts tagged with `name` (lowercase match), newest first,
    /// cursor-paged like the feed.
    pub fn list_posts_by_hashtag(
        &self,
        name: &str,
        cursor: Option<i64>,
    ) -> Result<Vec<PostView>, SocialError> {
        let name = name.to_lowercase();
        let mut params: Vec<Value> = vec![Value::Text(name)];
        let mut cursor_sql = String::new();
        if let Some(last_id) = cursor {
            params.push(Value::Integer(last_id));
            cursor_sql = format!(" AND p.id < ?{}", params.len());
        }
        let sql = format!(
            "SELECT p.id FROM posts p
             JOIN post_hashtags ph ON ph.post_id = p.id
             JOIN hashtags h ON h.id = ph.hashtag_id
             WHERE h.name = ?1{} ORDER BY p.id DESC LIMIT {}",
            cursor_sql,
            super::hydrate::PAGE_SIZE,
        );
        let rows = self.sql.query(&sql, &params)?;
        let ids: Vec<i64> = rows.iter().filter_map(|r| r.get_i64("id")).collect();
        self.hydrate_posts(&ids, false)
    }
}

#[cfg(test)]
mod tests {
    use perch_sql::{SQLExec, Value};

    use crate::model::CreatePost;
    use crate::service::testutil::{signup, test_service};
    use crate::service::SocialError;

    #[test]
    fn create_post_links_hashtags_and_images() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");

        let post = svc
            .create_post(
                author,
                CreatePost {
                    content: "hello #node and #react".into(),
                    image_refs: vec!["images/x.jpg".into(), "images/y.jpg".into()],
                },
            )
            .unwrap();

        assert_eq!(post.user.id, author);
        assert_eq!(post.images.len(), 2);
        assert_eq!(post.images[0].src, "images/x.jpg");

        let tags = svc
            .sql
            .query("SELECT name FROM hashtags ORDER BY name", &[])
            .unwrap();
        let names: Vec<&str> = tags.iter().filter_map(|r| r.get_str("name")).collect();
        assert_eq!(names, vec!["node", "react"]);
    }

    #[test]
    fn repeated_tags_reuse_hashtag_rows() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");

        svc.create_post(author, CreatePost { content: "one #node".into(), image_refs: vec![] })
            .unwrap();
        svc.create_post(author, CreatePost { content: "two #Node #node".into(), image_refs: vec![] })
            .unwrap();

        let tags = svc.sql.query("SELECT id FROM hashtags", &[]).unwrap();
        assert_eq!(tags.len(), 1);

        let links = svc.sql.query("SELECT post_id FROM post_hashtags", &[]).unwrap();
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn empty_content_is_rejected() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");
        let result = svc.create_post(author, CreatePost { content: "  ".into(), image_refs: vec![] });
        assert!(matches!(result, Err(SocialError::Validation(_))));
    }

    #[test]
    fn delete_by_non_author_is_a_noop() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");
        let other = signup(&svc, "b@example.com", "b");
        let post = svc
            .create_post(author, CreatePost { content: "mine".into(), image_refs: vec![] })
            .unwrap();

        let affected = svc.delete_post(post.id, other).unwrap();
        assert_eq!(affected, 0);
        // Still retrievable.
        assert_eq!(svc.get_post(post.id).unwrap().id, post.id);
    }

    #[test]
    fn delete_by_author_removes_post_and_children() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");
        let other = signup(&svc, "b@example.com", "b");
        let post = svc
            .create_post(author, CreatePost { content: "bye #tag".into(), image_refs: vec![] })
            .unwrap();
        svc.create_comment(post.id, other, "so long".into()).unwrap();
        svc.add_like(post.id, other).unwrap();

        let affected = svc.delete_post(post.id, author).unwrap();
        assert_eq!(affected, 1);
        assert!(svc.get_post(post.id).is_err());

        let comments = svc
            .sql
            .query("SELECT id FROM comments WHERE post_id = ?1", &[Value::Integer(post.id)])
            .unwrap();
        assert!(comments.is_empty());
        let likes = svc
            .sql
            .query("SELECT post_id FROM likes WHERE post_id = ?1", &[Value::Integer(post.id)])
            .unwrap();
        assert!(likes.is_empty());
    }

    #[test]
    fn hashtag_feed_filters_by_tag() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");
        let tagged = svc
            .create_post(author, CreatePost { content: "with #Node".into(), image_refs: vec![] })
            .unwrap();
        svc.create_post(author, CreatePost { content: "without".into(), image_refs: vec![] })
            .unwrap();

        let page = svc.list_posts_by_hashtag("node", None).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, tagged.id);
    }
}
