use serde::{Deserialize, Serialize};

use crate::model::{CommentView, Profile};

/// A bare post row.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    /// Id of the root original when this post is a retweet; None for
    /// originals. Never points at another retweet — the root is
    /// resolved at creation time.
    pub retweet_of_id: Option<i64>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// An image attached to a post. `src` is the blob key.
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub id: i64,
    pub src: String,
}

/// A user appearing in a post's liker list.
///
/// Single-post fetches carry the nickname; feed fetches are id-only.
#[derive(Debug, Clone, Serialize)]
pub struct Liker {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// A fully hydrated post: author, images, comments with authors,
/// likers, and — for retweets — the original, one level deep.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub content: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweet_of_id: Option<i64>,
    pub user: Profile,
    pub images: Vec<ImageView>,
    pub comments: Vec<CommentView>,
    pub likers: Vec<Liker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweet: Option<Box<PostView>>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    pub content: String,
    /// Blob keys returned by the image upload endpoint.
    #[serde(default)]
    pub image_refs: Vec<String>,
}
