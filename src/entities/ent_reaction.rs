// EntReaction - an actor's reaction to exactly one target

use serde::{Deserialize, Serialize};

use super::{is_unset, Entity};
use crate::infrastructure::store::{Collection, Document};

/// What a reaction points at. The populated id field on the stored record
/// is the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionTarget {
    Content(i64),
    Comment(i64),
    Post(i64),
}

impl ReactionTarget {
    pub const FIELDS: [&'static str; 3] = ["contentId", "commentId", "postId"];

    pub fn field(&self) -> &'static str {
        match self {
            ReactionTarget::Content(_) => "contentId",
            ReactionTarget::Comment(_) => "commentId",
            ReactionTarget::Post(_) => "postId",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReactionTarget::Content(_) => "content",
            ReactionTarget::Comment(_) => "comment",
            ReactionTarget::Post(_) => "post",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ReactionTarget::Content(id) | ReactionTarget::Comment(id) | ReactionTarget::Post(id) => *id,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            ReactionTarget::Content(_) => Collection::Content,
            ReactionTarget::Comment(_) => Collection::Comments,
            ReactionTarget::Post(_) => Collection::Posts,
        }
    }

    pub fn from_field(field: &str, id: i64) -> Option<Self> {
        match field {
            "contentId" => Some(ReactionTarget::Content(id)),
            "commentId" => Some(ReactionTarget::Comment(id)),
            "postId" => Some(ReactionTarget::Post(id)),
            _ => None,
        }
    }

    /// Reads the discriminant from a stored reaction. Records with zero or
    /// several target fields are not valid reactions.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let mut found = Self::FIELDS
            .iter()
            .filter_map(|field| doc.get_i64(field).and_then(|id| Self::from_field(field, id)));
        let target = found.next()?;
        match found.next() {
            Some(_) => None,
            None => Some(target),
        }
    }

    /// Unique key of the reaction relationship for this target kind.
    pub fn unique_key(&self) -> [&'static str; 2] {
        ["actorId", self.field()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntReaction {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub actor_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
}

impl EntReaction {
    pub fn new(actor_id: i64, target: ReactionTarget) -> Self {
        let mut reaction = Self {
            id: 0,
            actor_id,
            content_id: None,
            comment_id: None,
            post_id: None,
            created_at: 0,
        };
        match target {
            ReactionTarget::Content(id) => reaction.content_id = Some(id),
            ReactionTarget::Comment(id) => reaction.comment_id = Some(id),
            ReactionTarget::Post(id) => reaction.post_id = Some(id),
        }
        reaction
    }

    pub fn target(&self) -> Option<ReactionTarget> {
        match (self.content_id, self.comment_id, self.post_id) {
            (Some(id), None, None) => Some(ReactionTarget::Content(id)),
            (None, Some(id), None) => Some(ReactionTarget::Comment(id)),
            (None, None, Some(id)) => Some(ReactionTarget::Post(id)),
            _ => None,
        }
    }
}

impl Entity for EntReaction {
    const COLLECTION: Collection = Collection::Reactions;

    fn label() -> &'static str {
        "Reaction"
    }
}
