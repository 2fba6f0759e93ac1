mod comment;
mod post;
mod user;

pub use comment::*;
pub use post::*;
pub use user::*;
