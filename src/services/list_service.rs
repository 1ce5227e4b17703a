// ListService - grouped lists of content. Name uniqueness per owner and
// membership uniqueness are both unique keys in the store.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entities::{
    EntContent, EntList, EntListEntry, Entity, StoredEntity, LIST_DESCRIPTION, LIST_NAME,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Document, Filter, InsertOutcome, SharedStore, SortKey};
use crate::services::ensure_owner;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewList {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A list with its members in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    #[serde(flatten)]
    pub list: EntList,
    pub content_ids: Vec<i64>,
}

#[derive(Clone)]
pub struct ListService {
    store: SharedStore,
}

impl ListService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn owned(&self, actor_id: i64, id: i64) -> AppResult<EntList> {
        let list = EntList::gen_enforce(self.store.as_ref(), id).await?;
        ensure_owner(list.owner_id, actor_id, EntList::label(), id)?;
        Ok(list)
    }

    fn duplicate_name(name: &str) -> AppError {
        AppError::Conflict(format!("A list named '{}' already exists", name))
    }

    pub async fn create(&self, owner_id: i64, input: NewList) -> AppResult<EntList> {
        let list = EntList {
            id: 0,
            owner_id,
            name: LIST_NAME.validate(&input.name)?,
            description: LIST_DESCRIPTION.validate(&input.description)?,
            created_at: 0,
            updated_at: 0,
        };
        match self
            .store
            .insert_unique(EntList::COLLECTION, Document::from_entity(&list)?, EntList::UNIQUE_KEY)
            .await?
        {
            InsertOutcome::Inserted(doc) => {
                let saved: EntList = doc.into_entity()?;
                info!(list_id = saved.id, owner_id, "list created");
                Ok(saved)
            }
            InsertOutcome::AlreadyExists => Err(Self::duplicate_name(&list.name)),
        }
    }

    /// A rename that collides with another of the owner's lists is a
    /// `Conflict`.
    pub async fn update(&self, actor_id: i64, id: i64, patch: ListPatch) -> AppResult<EntList> {
        self.owned(actor_id, id).await?;

        let mut changes = Document::new();
        let mut new_name = None;
        if let Some(name) = patch.name {
            let name = LIST_NAME.validate(&name)?;
            changes.set("name", name.clone());
            new_name = Some(name);
        }
        if let Some(description) = patch.description {
            changes.set("description", LIST_DESCRIPTION.validate(&description)?);
        }
        if changes.as_map().is_empty() {
            return Err(AppError::invalid("Nothing to update"));
        }

        match self.store.update(EntList::COLLECTION, id, changes).await {
            Ok(Some(doc)) => doc.into_entity(),
            Ok(None) => Err(AppError::not_found(format!("List {} not found", id))),
            Err(AppError::Conflict(_)) => Err(Self::duplicate_name(new_name.as_deref().unwrap_or(""))),
            Err(err) => Err(err),
        }
    }

    /// Entries of the deleted list stay behind like any other orphan.
    pub async fn delete(&self, actor_id: i64, id: i64) -> AppResult<()> {
        self.owned(actor_id, id).await?;
        self.store
            .delete_one(EntList::COLLECTION, &Filter::by_id(id))
            .await?;
        info!(list_id = id, "list deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> AppResult<ListView> {
        let list = EntList::gen_enforce(self.store.as_ref(), id).await?;
        let entries = self
            .store
            .find(
                EntListEntry::COLLECTION,
                &Filter::new().eq("listId", id),
                &[SortKey::asc("createdAt"), SortKey::asc("id")],
                0,
                None,
            )
            .await?;
        let content_ids = entries
            .iter()
            .filter_map(|entry| entry.get_i64("contentId"))
            .collect();
        Ok(ListView { list, content_ids })
    }

    pub async fn add_item(&self, actor_id: i64, list_id: i64, content_id: i64) -> AppResult<ListView> {
        self.owned(actor_id, list_id).await?;
        EntContent::gen_enforce(self.store.as_ref(), content_id).await?;

        let entry = EntListEntry {
            id: 0,
            list_id,
            content_id,
            created_at: 0,
        };
        let outcome = self
            .store
            .insert_unique(
                EntListEntry::COLLECTION,
                Document::from_entity(&entry)?,
                EntListEntry::UNIQUE_KEY,
            )
            .await?;
        if outcome == InsertOutcome::AlreadyExists {
            return Err(AppError::Conflict(format!(
                "Content {} is already in list {}",
                content_id, list_id
            )));
        }
        info!(list_id, content_id, "list item added");
        self.get(list_id).await
    }

    pub async fn remove_item(&self, actor_id: i64, list_id: i64, content_id: i64) -> AppResult<ListView> {
        self.owned(actor_id, list_id).await?;
        let removed = self
            .store
            .delete_one(
                EntListEntry::COLLECTION,
                &Filter::new().eq("listId", list_id).eq("contentId", content_id),
            )
            .await?;
        if removed == 0 {
            return Err(AppError::not_found(format!(
                "Content {} is not in list {}",
                content_id, list_id
            )));
        }
        self.get(list_id).await
    }
}
