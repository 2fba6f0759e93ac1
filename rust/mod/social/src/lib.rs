//! Social module — posts, comments, likes, retweets, follows, accounts.
//!
//! # Resources
//!
//! - **User** — account with email + argon2id password hash
//! - **Post** — feed entry; a retweet is a post whose `retweet_of_id`
//!   points at the root original
//! - **Comment** — belongs to a post and an author
//! - **Image** — uploaded file attached to a post (stored in the blob store)
//! - **Hashtag** — lowercased tag extracted from post content
//! - **Like / Follow** — join-table edges with set semantics
//!
//! # Usage
//!
//! ```ignore
//! use social::{SocialModule, service::SocialConfig};
//!
//! let module = SocialModule::new(sql, blob, SocialConfig::default())?;
//! let router = module.routes();
//! ```

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use perch_core::Module;

use crate::service::{SocialConfig, SocialService};

/// Social module implementing the Module trait.
pub struct SocialModule {
    service: Arc<SocialService>,
}

impl SocialModule {
    /// Create a new SocialModule, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn perch_sql::SQLStore>,
        blob: Arc<dyn perch_blob::BlobStore>,
        config: SocialConfig,
    ) -> Result<Self, perch_core::ServiceError> {
        let service = SocialService::new(sql, blob, config)
            .map_err(perch_core::ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying SocialService.
    pub fn service(&self) -> &Arc<SocialService> {
        &self.service
    }
}

impl Module for SocialModule {
    fn name(&self) -> &str {
        "social"
    }

    fn routes(&self) -> Router {
        api::build_router(Arc::clone(&self.service))
    }
}
