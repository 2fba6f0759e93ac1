use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A full user row, including the password hash.
///
/// Deliberately does not derive `Serialize`: this type must never
/// cross the HTTP boundary. Responses use [`Profile`] / [`AccountView`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Public projection of a user: id and nickname only.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub nickname: String,
}

/// Profile plus social-graph counts, returned by GET /user/{id}.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub nickname: String,
    pub post_count: i64,
    pub follower_count: i64,
    pub following_count: i64,
}

/// The login aggregate: everything about the account except the
/// password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub created_at: String,
    /// Ids of the user's posts, newest first.
    pub posts: Vec<i64>,
    pub followings: Vec<Profile>,
    pub followers: Vec<Profile>,
}

/// Input for creating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    pub email: String,
    pub nickname: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Why a credential check failed. Both variants surface as HTTP 401;
/// the reason string lets the client distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CredentialRejection {
    #[error("no account with that email")]
    UnknownEmail,

    #[error("wrong password")]
    WrongPassword,
}

/// JWT claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    /// Session id. Logout revokes the session, invalidating the token.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token issuance response.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
