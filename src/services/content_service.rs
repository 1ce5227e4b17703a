// ContentService - publishing and owner edits for content items, plus view
// counting and watch history. Media is uploaded elsewhere; only its URLs
// arrive here.

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::entities::{
    EntContent, EntWatchEntry, Entity, StoredEntity, CONTENT_DESCRIPTION, CONTENT_TITLE,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Document, Filter, InsertOutcome, SharedStore};
use crate::infrastructure::viewer::ViewerContext;
use crate::services::ensure_owner;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    pub title: String,
    pub description: String,
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

fn required_url(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct ContentService {
    store: SharedStore,
}

impl ContentService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn owned(&self, actor_id: i64, id: i64) -> AppResult<EntContent> {
        let item = EntContent::gen_enforce(self.store.as_ref(), id).await?;
        ensure_owner(item.owner_id, actor_id, EntContent::label(), id)?;
        Ok(item)
    }

    #[instrument(skip(self, input))]
    pub async fn publish(&self, owner_id: i64, input: NewContent) -> AppResult<EntContent> {
        let duration = if input.duration.is_finite() && input.duration >= 0.0 {
            input.duration
        } else {
            return Err(AppError::invalid("duration must be a non-negative number"));
        };
        let item = EntContent {
            id: 0,
            owner_id,
            title: CONTENT_TITLE.validate(&input.title)?,
            description: CONTENT_DESCRIPTION.validate(&input.description)?,
            video_url: required_url("videoUrl", &input.video_url)?,
            thumbnail_url: input
                .thumbnail_url
                .map(|url| required_url("thumbnailUrl", &url))
                .transpose()?,
            duration,
            is_published: input.is_published.unwrap_or(true),
            views: 0,
            created_at: 0,
            updated_at: 0,
        };
        let saved = EntContent::create(self.store.as_ref(), &item).await?;
        info!(content_id = saved.id, "content published");
        Ok(saved)
    }

    pub async fn update(&self, actor_id: i64, id: i64, patch: ContentPatch) -> AppResult<EntContent> {
        self.owned(actor_id, id).await?;

        let mut changes = Document::new();
        if let Some(title) = patch.title {
            changes.set("title", CONTENT_TITLE.validate(&title)?);
        }
        if let Some(description) = patch.description {
            changes.set("description", CONTENT_DESCRIPTION.validate(&description)?);
        }
        if let Some(url) = patch.thumbnail_url {
            changes.set("thumbnailUrl", required_url("thumbnailUrl", &url)?);
        }
        if changes.as_map().is_empty() {
            return Err(AppError::invalid("Nothing to update"));
        }

        self.store
            .update(EntContent::COLLECTION, id, changes)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Content {} not found", id)))?
            .into_entity()
    }

    /// Deletes the item and hands it back so the caller can release its
    /// assets. Reactions, comments and list entries are left in place.
    pub async fn delete(&self, actor_id: i64, id: i64) -> AppResult<EntContent> {
        let item = self.owned(actor_id, id).await?;
        self.store
            .delete_one(EntContent::COLLECTION, &Filter::by_id(id))
            .await?;
        info!(content_id = id, "content deleted");
        Ok(item)
    }

    pub async fn toggle_publish(&self, actor_id: i64, id: i64) -> AppResult<EntContent> {
        let item = self.owned(actor_id, id).await?;
        let patch = Document::new().with("isPublished", !item.is_published);
        self.store
            .update(EntContent::COLLECTION, id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Content {} not found", id)))?
            .into_entity()
    }

    /// Counts one view and adds the item to the viewer's watch history.
    /// Drafts are only viewable by their owner.
    pub async fn record_view(&self, viewer: ViewerContext, id: i64) -> AppResult<EntContent> {
        let item = EntContent::gen_enforce(self.store.as_ref(), id).await?;
        if !item.is_visible_to(viewer.viewer_id) {
            return Err(AppError::not_found(format!("Content {} not found", id)));
        }

        self.store
            .increment(EntContent::COLLECTION, id, "views", 1)
            .await?;

        if let Some(actor_id) = viewer.viewer_id {
            let entry = EntWatchEntry {
                id: 0,
                actor_id,
                content_id: id,
                created_at: 0,
            };
            let outcome = self
                .store
                .insert_unique(
                    EntWatchEntry::COLLECTION,
                    Document::from_entity(&entry)?,
                    EntWatchEntry::UNIQUE_KEY,
                )
                .await?;
            if outcome == InsertOutcome::AlreadyExists {
                debug!(actor_id, content_id = id, "already in watch history");
            }
        }

        EntContent::gen_enforce(self.store.as_ref(), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::Collection;
    use crate::services::test_support::store;

    fn new_content(title: &str) -> NewContent {
        NewContent {
            title: title.to_string(),
            description: "a description".to_string(),
            video_url: "https://assets.example.com/v.mp4".to_string(),
            thumbnail_url: None,
            duration: 42.5,
            is_published: None,
        }
    }

    #[tokio::test]
    async fn test_publish_validates_and_defaults_to_published() {
        let service = ContentService::new(store().await);
        let item = service.publish(1, new_content(" Intro ")).await.unwrap();
        assert_eq!(item.title, "Intro");
        assert!(item.is_published);
        assert_eq!(item.views, 0);

        assert!(service.publish(1, new_content("")).await.is_err());
        let mut bad = new_content("ok");
        bad.video_url = "  ".to_string();
        assert!(matches!(service.publish(1, bad).await, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_owner_only_edits() {
        let service = ContentService::new(store().await);
        let item = service.publish(1, new_content("mine")).await.unwrap();

        let patch = ContentPatch {
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(2, item.id, patch.clone()).await,
            Err(AppError::NotFound(_))
        ));
        let updated = service.update(1, item.id, patch).await.unwrap();
        assert_eq!(updated.title, "renamed");

        let hidden = service.toggle_publish(1, item.id).await.unwrap();
        assert!(!hidden.is_published);
        assert!(matches!(service.delete(2, item.id).await, Err(AppError::NotFound(_))));
        let deleted = service.delete(1, item.id).await.unwrap();
        assert_eq!(deleted.id, item.id);
        assert!(matches!(service.delete(1, item.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_views_and_watch_history() {
        let store = store().await;
        let service = ContentService::new(store.clone());
        let item = service.publish(1, new_content("watch me")).await.unwrap();

        service.record_view(ViewerContext::new(2), item.id).await.unwrap();
        service.record_view(ViewerContext::new(2), item.id).await.unwrap();
        let viewed = service.record_view(ViewerContext::anonymous(), item.id).await.unwrap();
        assert_eq!(viewed.views, 3);

        let history = store
            .count(Collection::WatchHistory, &Filter::new().eq("actorId", 2))
            .await
            .unwrap();
        assert_eq!(history, 1);

        service.toggle_publish(1, item.id).await.unwrap();
        assert!(matches!(
            service.record_view(ViewerContext::new(2), item.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(service.record_view(ViewerContext::new(1), item.id).await.is_ok());
    }
}
