mod accounts;
mod images;
mod middleware;
mod post;
pub(crate) mod posts;

use std::sync::Arc;

use axum::Router;

use crate::service::SocialService;

pub use middleware::Actor;

/// Shared application state.
pub type AppState = Arc<SocialService>;

/// Build the complete social API router.
pub fn build_router(svc: Arc<SocialService>) -> Router {
    Router::new()
        .merge(accounts::routes())
        .merge(posts::routes())
        .merge(post::routes())
        .merge(images::routes())
        .layer(axum::middleware::from_fn_with_state(
            svc.clone(),
            middleware::auth_middleware,
        ))
        .with_state(svc)
}
