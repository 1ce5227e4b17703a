use tracing::info;

use crate::entities::{EntComment, EntContent, Entity, StoredEntity, COMMENT_BODY};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Document, Filter, SharedStore};
use crate::services::ensure_owner;

#[derive(Clone)]
pub struct CommentService {
    store: SharedStore,
}

impl CommentService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn owned(&self, actor_id: i64, id: i64) -> AppResult<EntComment> {
        let comment = EntComment::gen_enforce(self.store.as_ref(), id).await?;
        ensure_owner(comment.owner_id, actor_id, EntComment::label(), id)?;
        Ok(comment)
    }

    /// Comments go on items the author can see.
    pub async fn add(&self, actor_id: i64, content_id: i64, text: &str) -> AppResult<EntComment> {
        let body = COMMENT_BODY.validate(text)?;
        let parent = EntContent::gen_enforce(self.store.as_ref(), content_id).await?;
        if !parent.is_visible_to(Some(actor_id)) {
            return Err(AppError::not_found(format!("Content {} not found", content_id)));
        }

        let comment = EntComment {
            id: 0,
            content_id,
            owner_id: actor_id,
            content: body,
            created_at: 0,
            updated_at: 0,
        };
        let saved = EntComment::create(self.store.as_ref(), &comment).await?;
        info!(comment_id = saved.id, content_id, "comment added");
        Ok(saved)
    }

    pub async fn update(&self, actor_id: i64, id: i64, text: &str) -> AppResult<EntComment> {
        let body = COMMENT_BODY.validate(text)?;
        self.owned(actor_id, id).await?;
        self.store
            .update(EntComment::COLLECTION, id, Document::new().with("content", body))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Comment {} not found", id)))?
            .into_entity()
    }

    pub async fn delete(&self, actor_id: i64, id: i64) -> AppResult<()> {
        self.owned(actor_id, id).await?;
        self.store
            .delete_one(EntComment::COLLECTION, &Filter::by_id(id))
            .await?;
        info!(comment_id = id, "comment deleted");
        Ok(())
    }
}
