//! Feed assembly: batch hydration of posts and cursor pagination.
//!
//! A hydrated post carries its author, images, comments (each with
//! author), likers, and — when the post is a retweet — the root
//! original hydrated the same way. Retweet chains are normalized to
//! the root at creation time, so hydration never recurses: one extra
//! batch fetch covers every original.

use std::collections::HashMap;

use perch_sql::{Row, SQLExec, Value};

use crate::model::{CommentView, ImageView, Liker, Post, PostView, Profile};
use crate::service::{SocialError, SocialService};

/// Feed page size. Fixed; the cursor makes pages stable under
/// concurrent inserts and deletes.
pub const PAGE_SIZE: usize = 10;

/// Build `?N,?N+1,...` placeholders for an IN list.
fn placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(",")
}

fn id_params(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}

pub(crate) fn post_from_row(row: &Row) -> Result<Post, SocialError> {
    Ok(Post {
        id: row
            .get_i64("id")
            .ok_or_else(|| SocialError::Internal("posts row missing id".into()))?,
        content: row.get_str("content").unwrap_or_default().to_string(),
        author_id: row
            .get_i64("author_id")
            .ok_or_else(|| SocialError::Internal("posts row missing author_id".into()))?,
        retweet_of_id: row.get_i64("retweet_of_id"),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
    })
}

impl SocialService {
    /// Fetch and hydrate a single post. Likers carry nicknames.
    pub fn get_post(&self, id: i64) -> Result<PostView, SocialError> {
        let mut views = self.hydrate_posts(&[id], true)?;
        views
            .pop()
            .ok_or_else(|| SocialError::NotFound(format!("post {}", id)))
    }

    /// List the feed, newest first, page size [`PAGE_SIZE`].
    ///
    /// `cursor` is the id of the last post the client has seen, used
    /// as an exclusive upper bound. `author` scopes the page to one
    /// user's posts (profile feed). Likers are id-only on list pages.
    pub fn list_posts(
        &self,
        cursor: Option<i64>,
        author: Option<i64>,
    ) -> Result<Vec<PostView>, SocialError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(last_id) = cursor {
            params.push(Value::Integer(last_id));
            clauses.push(format!("id < ?{}", params.len()));
        }
        if let Some(author_id) = author {
            params.push(Value::Integer(author_id));
            clauses.push(format!("author_id = ?{}", params.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT id FROM posts{} ORDER BY id DESC LIMIT {}",
            where_sql, PAGE_SIZE,
        );
        let rows = self.sql.query(&sql, &params)?;
        let ids: Vec<i64> = rows.iter().filter_map(|r| r.get_i64("id")).collect();

        self.hydrate_posts(&ids, false)
    }

    /// Hydrate a batch of posts, preserving the order of `ids`.
    /// Unknown ids are skipped. One query per related table, not N+1.
    pub fn hydrate_posts(
        &self,
        ids: &[i64],
        liker_nicknames: bool,
    ) -> Result<Vec<PostView>, SocialError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let posts = self.fetch_posts(ids)?;

        // Second batch for the originals that retweets point at.
        let mut original_ids: Vec<i64> = posts
            .values()
            .filter_map(|p| p.retweet_of_id)
            .filter(|root| !posts.contains_key(root))
            .collect();
        original_ids.sort_unstable();
        original_ids.dedup();
        let originals = self.fetch_posts(&original_ids)?;

        let mut all_ids: Vec<i64> = posts.keys().chain(originals.keys()).copied().collect();
        all_ids.sort_unstable();

        let authors = {
            let mut author_ids: Vec<i64> = posts
                .values()
                .chain(originals.values())
                .map(|p| p.author_id)
                .collect();
            author_ids.sort_unstable();
            author_ids.dedup();
            self.fetch_profiles(&author_ids)?
        };
        let images = self.fetch_images(&all_ids)?;
        let comments = self.fetch_comments(&all_ids)?;
        let likers = self.fetch_likers(&all_ids, liker_nicknames)?;

        // A post can appear both as a feed entry and as the nested root
        // of a retweet on the same page, so related rows are cloned out
        // rather than moved.
        let assemble = |post: &Post, retweet: Option<Box<PostView>>| -> Result<PostView, SocialError> {
            let user = authors
                .get(&post.author_id)
                .cloned()
                .ok_or_else(|| SocialError::Internal(format!("author {} missing", post.author_id)))?;
            Ok(PostView {
                id: post.id,
                content: post.content.clone(),
                created_at: post.created_at.clone(),
                retweet_of_id: post.retweet_of_id,
                user,
                images: images.get(&post.id).cloned().unwrap_or_default(),
                comments: comments.get(&post.id).cloned().unwrap_or_default(),
                likers: likers.get(&post.id).cloned().unwrap_or_default(),
                retweet,
            })
        };

        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(post) = posts.get(id) else { continue };
            let retweet = match post.retweet_of_id {
                Some(root) => {
                    // The root may live in either batch.
                    match originals.get(&root).or_else(|| posts.get(&root)) {
                        Some(orig) => Some(Box::new(assemble(orig, None)?)),
                        // Root deleted concurrently; present as original.
                        None => None,
                    }
                }
                None => None,
            };
            views.push(assemble(post, retweet)?);
        }
        Ok(views)
    }

    fn fetch_posts(&self, ids: &[i64]) -> Result<HashMap<i64, Post>, SocialError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT id, content, author_id, retweet_of_id, created_at
             FROM posts WHERE id IN ({})",
            placeholders(1, ids.len()),
        );
        let rows = self.sql.query(&sql, &id_params(ids))?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in &rows {
            let post = post_from_row(row)?;
            out.insert(post.id, post);
        }
        Ok(out)
    }

    pub(crate) fn fetch_profiles(&self, ids: &[i64]) -> Result<HashMap<i64, Profile>, SocialError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT id, nickname FROM users WHERE id IN ({})",
            placeholders(1, ids.len()),
        );
        let rows = self.sql.query(&sql, &id_params(ids))?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id = row
                .get_i64("id")
                .ok_or_else(|| SocialError::Internal("users row missing id".into()))?;
            out.insert(
                id,
                Profile {
                    id,
                    nickname: row.get_str("nickname").unwrap_or_default().to_string(),
                },
            );
        }
        Ok(out)
    }

    /// Images per post, insertion order.
    fn fetch_images(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<ImageView>>, SocialError> {
        let sql = format!(
            "SELECT id, src, post_id FROM images WHERE post_id IN ({}) ORDER BY id ASC",
            placeholders(1, post_ids.len()),
        );
        let rows = self.sql.query(&sql, &id_params(post_ids))?;
        let mut out: HashMap<i64, Vec<ImageView>> = HashMap::new();
        for row in &rows {
            let post_id = row
                .get_i64("post_id")
                .ok_or_else(|| SocialError::Internal("images row missing post_id".into()))?;
            out.entry(post_id).or_default().push(ImageView {
                id: row.get_i64("id").unwrap_or_default(),
                src: row.get_str("src").unwrap_or_default().to_string(),
            });
        }
        Ok(out)
    }

    /// Comments per post, newest first, each with its author.
    fn fetch_comments(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<CommentView>>, SocialError> {
        let sql = format!(
            "SELECT c.id, c.content, c.post_id, c.created_at, u.id AS uid, u.nickname
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.post_id IN ({}) ORDER BY c.id DESC",
            placeholders(1, post_ids.len()),
        );
        let rows = self.sql.query(&sql, &id_params(post_ids))?;
        let mut out: HashMap<i64, Vec<CommentView>> = HashMap::new();
        for row in &rows {
            let post_id = row
                .get_i64("post_id")
                .ok_or_else(|| SocialError::Internal("comments row missing post_id".into()))?;
            out.entry(post_id).or_default().push(CommentView {
                id: row.get_i64("id").unwrap_or_default(),
                content: row.get_str("content").unwrap_or_default().to_string(),
                post_id,
                created_at: row.get_str("created_at").unwrap_or_default().to_string(),
                user: Profile {
                    id: row.get_i64("uid").unwrap_or_default(),
                    nickname: row.get_str("nickname").unwrap_or_default().to_string(),
                },
            });
        }
        Ok(out)
    }

    fn fetch_likers(
        &self,
        post_ids: &[i64],
        nicknames: bool,
    ) -> Result<HashMap<i64, Vec<Liker>>, SocialError> {
        let sql = format!(
            "SELECT l.post_id, l.user_id, u.nickname
             FROM likes l JOIN users u ON u.id = l.user_id
             WHERE l.post_id IN ({}) ORDER BY l.user_id ASC",
            placeholders(1, post_ids.len()),
        );
        let rows = self.sql.query(&sql, &id_params(post_ids))?;
        let mut out: HashMap<i64, Vec<Liker>> = HashMap::new();
        for row in &rows {
            let post_id = row
                .get_i64("post_id")
                .ok_or_else(|| SocialError::Internal("likes row missing post_id".into()))?;
            out.entry(post_id).or_default().push(Liker {
                id: row.get_i64("user_id").unwrap_or_default(),
                nickname: if nicknames {
                    row.get_str("nickname").map(|s| s.to_string())
                } else {
                    None
                },
            });
        }
        Ok(out)
    }
}

/// Existence check usable both on the store and inside a transaction.
pub(crate) fn post_exists<S: SQLExec + ?Sized>(sql: &S, id: i64) -> Result<bool, SocialError> {
    let rows = sql.query(
        "SELECT 1 AS one FROM posts WHERE id = ?1",
        &[Value::Integer(id)],
    )?;
    Ok(!rows.is_empty())
}

#[cfg(test)]
mod tests {
    use crate::model::CreatePost;
    use crate::service::testutil::{signup, test_service};

    #[test]
    fn pagination_pages_are_disjoint_and_ordered() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");
        for i in 0..25 {
            svc.create_post(
                author,
                CreatePost {
                    content: format!("post {}", i),
                    image_refs: vec![],
                },
            )
            .unwrap();
        }

        let page1 = svc.list_posts(None, None).unwrap();
        let ids1: Vec<i64> = page1.iter().map(|p| p.id).collect();
        assert_eq!(ids1, (16..=25).rev().collect::<Vec<i64>>());

        let page2 = svc.list_posts(Some(16), None).unwrap();
        let ids2: Vec<i64> = page2.iter().map(|p| p.id).collect();
        assert_eq!(ids2, (6..=15).rev().collect::<Vec<i64>>());

        assert!(ids1.iter().all(|id| !ids2.contains(id)));
    }

    #[test]
    fn empty_feed_is_valid() {
        let (_dir, svc) = test_service();
        assert!(svc.list_posts(None, None).unwrap().is_empty());
        assert!(svc.list_posts(Some(100), None).unwrap().is_empty());
    }

    #[test]
    fn author_filter_scopes_the_page() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        let b = signup(&svc, "b@example.com", "b");
        for i in 0..3 {
            svc.create_post(a, CreatePost { content: format!("a{}", i), image_refs: vec![] })
                .unwrap();
            svc.create_post(b, CreatePost { content: format!("b{}", i), image_refs: vec![] })
                .unwrap();
        }

        let page = svc.list_posts(None, Some(a)).unwrap();
        assert_eq!(page.len(), 3);
        assert!(page.iter().all(|p| p.user.id == a));
    }

    #[test]
    fn hydrated_view_never_serializes_a_password() {
        let (_dir, svc) = test_service();
        let author = signup(&svc, "a@example.com", "a");
        let liker = signup(&svc, "b@example.com", "b");
        let post = svc
            .create_post(author, CreatePost { content: "hi".into(), image_refs: vec![] })
            .unwrap();
        svc.add_like(post.id, liker).unwrap();
        svc.create_comment(post.id, liker, "nice".into()).unwrap();

        let view = svc.get_post(post.id).unwrap();
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("email"));
    }

    #[test]
    fn comments_are_newest_first_with_authors() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        let b = signup(&svc, "b@example.com", "b");
        let post = svc
            .create_post(a, CreatePost { content: "hi".into(), image_refs: vec![] })
            .unwrap();
        let first = svc.create_comment(post.id, b, "first".into()).unwrap();
        let second = svc.create_comment(post.id, a, "second".into()).unwrap();

        let view = svc.get_post(post.id).unwrap();
        assert_eq!(view.comments.len(), 2);
        assert_eq!(view.comments[0].id, second.id);
        assert_eq!(view.comments[1].id, first.id);
        assert_eq!(view.comments[0].user.nickname, "a");
    }

    #[test]
    fn liker_nicknames_only_on_single_fetch() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        let b = signup(&svc, "b@example.com", "b");
        let post = svc
            .create_post(a, CreatePost { content: "hi".into(), image_refs: vec![] })
            .unwrap();
        svc.add_like(post.id, b).unwrap();

        let single = svc.get_post(post.id).unwrap();
        assert_eq!(single.likers[0].nickname.as_deref(), Some("b"));

        let page = svc.list_posts(None, None).unwrap();
        assert!(page[0].likers[0].nickname.is_none());
    }

    #[test]
    fn missing_post_is_not_found() {
        let (_dir, svc) = test_service();
        assert!(matches!(
            svc.get_post(99),
            Err(crate::service::SocialError::NotFound(_))
        ));
    }
}
