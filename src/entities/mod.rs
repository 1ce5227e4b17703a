// Entity layer - typed views over store documents

pub mod ent_actor;
pub mod ent_comment;
pub mod ent_content;
pub mod ent_follow;
pub mod ent_list;
pub mod ent_post;
pub mod ent_reaction;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Collection, Document, Store};

pub use ent_actor::EntActor;
pub use ent_comment::EntComment;
pub use ent_content::{EntContent, EntWatchEntry};
pub use ent_follow::EntFollow;
pub use ent_list::{EntList, EntListEntry};
pub use ent_post::EntPost;
pub use ent_reaction::{EntReaction, ReactionTarget};

pub(crate) fn is_unset(value: &i64) -> bool {
    *value == 0
}

// Entity trait that every stored record type implements
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    /// Human-readable name used in error messages.
    fn label() -> &'static str;
}

#[allow(async_fn_in_trait)]
pub trait StoredEntity: Entity + Sized {
    async fn gen_nullable(store: &dyn Store, id: i64) -> AppResult<Option<Self>> {
        match store.get(Self::COLLECTION, id).await? {
            Some(doc) => Ok(Some(doc.into_entity()?)),
            None => Ok(None),
        }
    }

    /// Like `gen_nullable`, but a missing record is `NotFound`.
    async fn gen_enforce(store: &dyn Store, id: i64) -> AppResult<Self> {
        Self::gen_nullable(store, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} {} not found", Self::label(), id)))
    }

    async fn create(store: &dyn Store, entity: &Self) -> AppResult<Self> {
        let saved = store
            .insert(Self::COLLECTION, Document::from_entity(entity)?)
            .await?;
        saved.into_entity()
    }
}

impl<T: Entity> StoredEntity for T {}

/// Character bounds for a user-supplied text field. Values are trimmed
/// before measuring.
#[derive(Debug, Clone, Copy)]
pub struct TextBounds {
    pub field: &'static str,
    pub min: usize,
    pub max: usize,
}

impl TextBounds {
    pub const fn new(field: &'static str, min: usize, max: usize) -> Self {
        Self { field, min, max }
    }

    pub fn validate(&self, value: &str) -> AppResult<String> {
        let trimmed = value.trim();
        let len = trimmed.chars().count();
        if len < self.min || len > self.max {
            return Err(AppError::invalid(format!(
                "{} must be between {} and {} characters",
                self.field, self.min, self.max
            )));
        }
        Ok(trimmed.to_string())
    }
}

pub const COMMENT_BODY: TextBounds = TextBounds::new("content", 1, 1080);
pub const POST_BODY: TextBounds = TextBounds::new("content", 2, 280);
pub const CONTENT_TITLE: TextBounds = TextBounds::new("title", 1, 200);
pub const CONTENT_DESCRIPTION: TextBounds = TextBounds::new("description", 2, 5000);
pub const LIST_NAME: TextBounds = TextBounds::new("name", 1, 100);
pub const LIST_DESCRIPTION: TextBounds = TextBounds::new("description", 0, 1000);
pub const USERNAME: TextBounds = TextBounds::new("username", 3, 30);
pub const FULL_NAME: TextBounds = TextBounds::new("fullName", 1, 100);
