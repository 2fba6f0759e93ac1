use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use perch_core::{new_id, now_rfc3339};
use perch_sql::{Row, SQLExec, Value};

use crate::model::{
    AccountView, Claims, CredentialRejection, Profile, ProfileView, Signup, TokenPair, User,
};
use crate::service::{SocialError, SocialService};

fn user_from_row(row: &Row) -> Result<User, SocialError> {
    Ok(User {
        id: row
            .get_i64("id")
            .ok_or_else(|| SocialError::Internal("users row missing id".into()))?,
        email: row.get_str("email").unwrap_or_default().to_string(),
        nickname: row.get_str("nickname").unwrap_or_default().to_string(),
        password_hash: row.get_str("password_hash").unwrap_or_default().to_string(),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
    })
}

impl SocialService {
    /// Create an account. The password is stored as an argon2id hash;
    /// a duplicate email is a Conflict.
    pub fn signup(&self, input: Signup) -> Result<Profile, SocialError> {
        if input.email.trim().is_empty() || input.nickname.trim().is_empty() {
            return Err(SocialError::Validation("email and nickname are required".into()));
        }
        if input.password.len() < 8 {
            return Err(SocialError::Validation("password must be at least 8 characters".into()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| SocialError::Internal(format!("password hashing failed: {}", e)))?
            .to_string();

        // The UNIQUE constraint on email backstops concurrent signups;
        // the insert maps constraint violations to Conflict.
        let id = self
            .sql
            .insert(
                "INSERT INTO users (email, nickname, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(input.email.clone()),
                    Value::Text(input.nickname.clone()),
                    Value::Text(hash),
                    Value::Text(now_rfc3339()),
                ],
            )
            .map_err(|e| match SocialError::from(e) {
                SocialError::Conflict(_) => {
                    SocialError::Conflict("that email is already in use".into())
                }
                other => other,
            })?;

        Ok(Profile {
            id,
            nickname: input.nickname,
        })
    }

    /// Check email + password. The outer error is a storage failure;
    /// the inner result distinguishes "no such email" from "wrong
    /// password" so the caller can surface the reason.
    pub fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Result<User, CredentialRejection>, SocialError> {
        let rows = self.sql.query(
            "SELECT id, email, nickname, password_hash, created_at
             FROM users WHERE email = ?1",
            &[Value::Text(email.to_string())],
        )?;
        let Some(row) = rows.first() else {
            return Ok(Err(CredentialRejection::UnknownEmail));
        };
        let user = user_from_row(row)?;

        let verified = PasswordHash::new(&user.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);

        if verified {
            Ok(Ok(user))
        } else {
            Ok(Err(CredentialRejection::WrongPassword))
        }
    }

    /// Issue a JWT bound to a new session row.
    pub fn issue_token(&self, user_id: i64) -> Result<TokenPair, SocialError> {
        let session_id = new_id();
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.config.token_ttl);

        let claims = Claims {
            sub: user_id.to_string(),
            sid: session_id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| SocialError::Internal(format!("JWT encode failed: {}", e)))?;

        self.sql.exec(
            "INSERT INTO sessions (id, user_id, revoked, issued_at, expires_at)
             VALUES (?1, ?2, 0, ?3, ?4)",
            &[
                Value::Text(session_id),
                Value::Integer(user_id),
                Value::Text(now.to_rfc3339()),
                Value::Text(exp.to_rfc3339()),
            ],
        )?;

        Ok(TokenPair {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_ttl,
        })
    }

    /// Verify and decode an access token. Rejects revoked sessions.
    pub fn verify_token(&self, token: &str) -> Result<Claims, SocialError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| SocialError::Unauthorized(format!("invalid token: {}", e)))?;
        let claims = token_data.claims;

        let rows = self.sql.query(
            "SELECT revoked FROM sessions WHERE id = ?1",
            &[Value::Text(claims.sid.clone())],
        )?;
        match rows.first().and_then(|r| r.get_i64("revoked")) {
            Some(0) => Ok(claims),
            Some(_) => Err(SocialError::Unauthorized("session has been revoked".into())),
            None => Err(SocialError::Unauthorized("unknown session".into())),
        }
    }

    /// Revoke a session (logout).
    pub fn logout(&self, session_id: &str) -> Result<(), SocialError> {
        self.sql.exec(
            "UPDATE sessions SET revoked = 1 WHERE id = ?1",
            &[Value::Text(session_id.to_string())],
        )?;
        Ok(())
    }

    /// The login aggregate: the account minus the password hash, with
    /// post ids and follower/following profiles.
    pub fn account_view(&self, user_id: i64) -> Result<AccountView, SocialError> {
        let rows = self.sql.query(
            "SELECT id, email, nickname, password_hash, created_at
             FROM users WHERE id = ?1",
            &[Value::Integer(user_id)],
        )?;
        let user = match rows.first() {
            Some(row) => user_from_row(row)?,
            None => return Err(SocialError::NotFound(format!("user {}", user_id))),
        };

        let post_rows = self.sql.query(
            "SELECT id FROM posts WHERE author_id = ?1 ORDER BY id DESC",
            &[Value::Integer(user_id)],
        )?;
        let posts: Vec<i64> = post_rows.iter().filter_map(|r| r.get_i64("id")).collect();

        Ok(AccountView {
            id: user.id,
            email: user.email,
            nickname: user.nickname,
            created_at: user.created_at,
            posts,
            followings: self.list_followings(user_id)?,
            followers: self.list_followers(user_id)?,
        })
    }

    /// Public profile with social-graph counts.
    pub fn profile_view(&self, user_id: i64) -> Result<ProfileView, SocialError> {
        let profile = self
            .fetch_profiles(&[user_id])?
            .remove(&user_id)
            .ok_or_else(|| SocialError::NotFound(format!("user {}", user_id)))?;

        let count = |sql: &str| -> Result<i64, SocialError> {
            let rows = self.sql.query(sql, &[Value::Integer(user_id)])?;
            Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
        };

        Ok(ProfileView {
            id: profile.id,
            nickname: profile.nickname,
            post_count: count("SELECT COUNT(*) AS cnt FROM posts WHERE author_id = ?1")?,
            follower_count: count("SELECT COUNT(*) AS cnt FROM follows WHERE following_id = ?1")?,
            following_count: count("SELECT COUNT(*) AS cnt FROM follows WHERE follower_id = ?1")?,
        })
    }
}
