use tracing::info;

use crate::entities::{EntPost, Entity, StoredEntity, POST_BODY};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Document, Filter, SharedStore};
use crate::services::ensure_owner;

#[derive(Clone)]
pub struct PostService {
    store: SharedStore,
}

impl PostService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, actor_id: i64, text: &str) -> AppResult<EntPost> {
        let post = EntPost {
            id: 0,
            owner_id: actor_id,
            content: POST_BODY.validate(text)?,
            created_at: 0,
            updated_at: 0,
        };
        let saved = EntPost::create(self.store.as_ref(), &post).await?;
        info!(post_id = saved.id, "post created");
        Ok(saved)
    }

    pub async fn update(&self, actor_id: i64, id: i64, text: &str) -> AppResult<EntPost> {
        let body = POST_BODY.validate(text)?;
        let post = EntPost::gen_enforce(self.store.as_ref(), id).await?;
        ensure_owner(post.owner_id, actor_id, EntPost::label(), id)?;
        self.store
            .update(EntPost::COLLECTION, id, Document::new().with("content", body))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Post {} not found", id)))?
            .into_entity()
    }

    pub async fn delete(&self, actor_id: i64, id: i64) -> AppResult<()> {
        let post = EntPost::gen_enforce(self.store.as_ref(), id).await?;
        ensure_owner(post.owner_id, actor_id, EntPost::label(), id)?;
        self.store
            .delete_one(EntPost::COLLECTION, &Filter::by_id(id))
            .await?;
        info!(post_id = id, "post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::store;

    #[tokio::test]
    async fn test_post_lifecycle() {
        let service = PostService::new(store().await);
        assert!(matches!(service.create(1, "x").await, Err(AppError::InvalidArgument(_))));
        assert!(service.create(1, &"y".repeat(281)).await.is_err());

        let post = service.create(1, "hello world").await.unwrap();
        assert!(matches!(
            service.update(2, post.id, "mine now").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(service.update(1, post.id, "edited").await.unwrap().content, "edited");
        assert!(matches!(service.delete(2, post.id).await, Err(AppError::NotFound(_))));
        service.delete(1, post.id).await.unwrap();
    }
}
