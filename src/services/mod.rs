// Owner-side write services. Ownership mismatches are reported as NotFound
// so callers cannot probe for records they do not own.

pub mod actor_service;
pub mod comment_service;
pub mod content_service;
pub mod list_service;
pub mod post_service;

use crate::error::{AppError, AppResult};

pub use actor_service::{ActorService, NewActor};
pub use comment_service::CommentService;
pub use content_service::{ContentPatch, ContentService, NewContent};
pub use list_service::{ListPatch, ListService, ListView, NewList};
pub use post_service::PostService;

pub(crate) fn ensure_owner(owner_id: i64, actor_id: i64, label: &str, id: i64) -> AppResult<()> {
    if owner_id == actor_id {
        Ok(())
    } else {
        Err(AppError::not_found(format!("{} {} not found", label, id)))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::infrastructure::store::{SharedStore, SqliteStore};

    pub async fn store() -> SharedStore {
        Arc::new(SqliteStore::new_in_memory().await.unwrap())
    }
}
