// Toggle Engine - create-or-remove for reactions and follows. Correctness
// rests on the store's unique index on the relationship key; the existence
// check only picks the fast path.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

use crate::entities::{EntFollow, EntReaction, ReactionTarget};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Collection, Document, Filter, InsertOutcome, SharedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Content,
    Comment,
    Post,
    Follow,
}

impl TargetKind {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "content" => Ok(TargetKind::Content),
            "comment" => Ok(TargetKind::Comment),
            "post" => Ok(TargetKind::Post),
            "follow" | "actor" => Ok(TargetKind::Follow),
            other => Err(AppError::invalid(format!("Unknown target kind: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Content => "content",
            TargetKind::Comment => "comment",
            TargetKind::Post => "post",
            TargetKind::Follow => "follow",
        }
    }

    /// Collection the target record lives in.
    fn target_collection(&self) -> Collection {
        match self {
            TargetKind::Content => Collection::Content,
            TargetKind::Comment => Collection::Comments,
            TargetKind::Post => Collection::Posts,
            TargetKind::Follow => Collection::Actors,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleState {
    pub active: bool,
}

/// A relationship record ready to be looked up or written.
struct Relationship {
    collection: Collection,
    record: Document,
    key_fields: [&'static str; 2],
    key: Filter,
}

impl Relationship {
    fn for_target(actor_id: i64, kind: TargetKind, target_id: i64) -> AppResult<Self> {
        match kind {
            TargetKind::Follow => Ok(Self {
                collection: Collection::Follows,
                record: Document::from_entity(&EntFollow::new(actor_id, target_id))?,
                key_fields: ["followerId", "followeeId"],
                key: Filter::new()
                    .eq("followerId", actor_id)
                    .eq("followeeId", target_id),
            }),
            _ => {
                let target = match kind {
                    TargetKind::Content => ReactionTarget::Content(target_id),
                    TargetKind::Comment => ReactionTarget::Comment(target_id),
                    _ => ReactionTarget::Post(target_id),
                };
                Ok(Self {
                    collection: Collection::Reactions,
                    record: Document::from_entity(&EntReaction::new(actor_id, target))?,
                    key_fields: target.unique_key(),
                    key: Filter::new()
                        .eq("actorId", actor_id)
                        .eq(target.field(), target_id),
                })
            }
        }
    }
}

#[derive(Clone)]
pub struct ToggleEngine {
    store: SharedStore,
}

impl ToggleEngine {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn validate(actor_id: i64, kind: TargetKind, target_id: i64) -> AppResult<()> {
        if actor_id <= 0 {
            return Err(AppError::invalid(format!("Invalid actor id: {}", actor_id)));
        }
        if target_id <= 0 {
            return Err(AppError::invalid(format!("Invalid target id: {}", target_id)));
        }
        if kind == TargetKind::Follow && actor_id == target_id {
            return Err(AppError::invalid("Actors cannot follow themselves"));
        }
        Ok(())
    }

    /// Flips the relationship between `actor_id` and the target. Concurrent
    /// calls for one key converge: at most one record ever exists, a lost
    /// insert race reports `active: true` and a lost delete race reports
    /// `active: false`.
    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        actor_id: i64,
        kind: TargetKind,
        target_id: i64,
    ) -> AppResult<ToggleState> {
        Self::validate(actor_id, kind, target_id)?;

        if self
            .store
            .get(kind.target_collection(), target_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(format!("{} target {} not found", kind, target_id)));
        }

        let relationship = Relationship::for_target(actor_id, kind, target_id)?;
        let existing = self
            .store
            .count(relationship.collection, &relationship.key)
            .await?;
        if existing > 0 {
            let deleted = self
                .store
                .delete_one(relationship.collection, &relationship.key)
                .await?;
            if deleted == 0 {
                debug!("relationship already removed by a concurrent toggle");
            }
            info!(actor_id, target_id, kind = kind.as_str(), "relationship removed");
            return Ok(ToggleState { active: false });
        }

        match self
            .store
            .insert_unique(
                relationship.collection,
                relationship.record,
                &relationship.key_fields,
            )
            .await?
        {
            InsertOutcome::Inserted(_) => {
                info!(actor_id, target_id, kind = kind.as_str(), "relationship created");
            }
            InsertOutcome::AlreadyExists => {
                debug!("relationship created by a concurrent toggle");
            }
        }
        Ok(ToggleState { active: true })
    }
}
