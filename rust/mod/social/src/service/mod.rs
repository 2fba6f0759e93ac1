pub mod account;
pub mod comment;
pub mod follow;
pub mod hashtag;
pub mod hydrate;
pub mod like;
pub mod post;
pub mod retweet;
pub mod schema;

use std::sync::Arc;

use thiserror::Error;

use perch_blob::BlobStore;
use perch_sql::{SQLError, SQLExec, SQLStore};

/// Social service error type.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<SocialError> for perch_core::ServiceError {
    fn from(e: SocialError) -> Self {
        match e {
            SocialError::NotFound(m) => perch_core::ServiceError::NotFound(m),
            SocialError::Forbidden(m) => perch_core::ServiceError::PermissionDenied(m),
            SocialError::Conflict(m) => perch_core::ServiceError::Conflict(m),
            SocialError::Validation(m) => perch_core::ServiceError::Validation(m),
            SocialError::Unauthorized(m) => perch_core::ServiceError::Unauthorized(m),
            SocialError::Storage(m) => perch_core::ServiceError::Storage(m),
            SocialError::Internal(m) => perch_core::ServiceError::Internal(m),
        }
    }
}

impl From<SQLError> for SocialError {
    fn from(e: SQLError) -> Self {
        let msg = e.to_string();
        if msg.contains("UNIQUE constraint") {
            SocialError::Conflict(msg)
        } else {
            SocialError::Storage(msg)
        }
    }
}

/// Configuration for the social service.
#[derive(Debug, Clone)]
pub struct SocialConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 24h).
    pub token_ttl: i64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "perch-dev-secret-change-me".to_string(),
            token_ttl: 86400, // 24h
        }
    }
}

/// The social service. Holds storage backends and configuration.
pub struct SocialService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) blob: Arc<dyn BlobStore>,
    pub(crate) config: SocialConfig,
}

impl SocialService {
    /// Create a new SocialService, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        blob: Arc<dyn BlobStore>,
        config: SocialConfig,
    ) -> Result<Arc<Self>, SocialError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql, blob, config }))
    }

    /// Run `f` atomically, bridging domain errors across the SQL
    /// transaction boundary. A domain error rolls the transaction back
    /// and is returned as-is.
    pub(crate) fn with_tx<T>(
        &self,
        mut f: impl FnMut(&dyn SQLExec) -> Result<T, SocialError>,
    ) -> Result<T, SocialError> {
        let mut out: Option<Result<T, SocialError>> = None;
        let tx_result = self.sql.transaction(&mut |tx| match f(tx) {
            Ok(v) => {
                out = Some(Ok(v));
                Ok(())
            }
            Err(e) => {
                out = Some(Err(e));
                Err(SQLError::Transaction("rolled back".into()))
            }
        });

        match (tx_result, out) {
            (Ok(()), Some(Ok(v))) => Ok(v),
            (_, Some(Err(e))) => Err(e),
            // Closure succeeded but BEGIN/COMMIT failed.
            (Err(e), _) => Err(SocialError::Storage(e.to_string())),
            (Ok(()), None) => Err(SocialError::Internal("transaction closure never ran".into())),
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use perch_blob::FileStore;
    use perch_sql::SqliteStore;

    use super::{SocialConfig, SocialService};
    use crate::model::Signup;

    /// In-memory service for tests. Keep the TempDir alive for the
    /// duration of the test — it backs the blob store.
    pub fn test_service() -> (tempfile::TempDir, Arc<SocialService>) {
        let sql: Arc<dyn perch_sql::SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let blob: Arc<dyn perch_blob::BlobStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let svc = SocialService::new(sql, blob, SocialConfig::default()).unwrap();
        (dir, svc)
    }

    /// Create a user and return their id.
    pub fn signup(svc: &SocialService, email: &str, nickname: &str) -> i64 {
        svc.signup(Signup {
            email: email.to_string(),
            nickname: nickname.to_string(),
            password: "hunter2!".to_string(),
        })
        .unwrap()
        .id
    }
}
