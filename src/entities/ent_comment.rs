// EntComment - text reply attached to a content item

use serde::{Deserialize, Serialize};

use super::{is_unset, Entity};
use crate::infrastructure::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntComment {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub content_id: i64,
    pub owner_id: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub updated_at: i64,
}

impl Entity for EntComment {
    const COLLECTION: Collection = Collection::Comments;

    fn label() -> &'static str {
        "Comment"
    }
}
