// EntPost - short-form text post

use serde::{Deserialize, Serialize};

use super::{is_unset, Entity};
use crate::infrastructure::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntPost {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub owner_id: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub updated_at: i64,
}

impl Entity for EntPost {
    const COLLECTION: Collection = Collection::Posts;

    fn label() -> &'static str {
        "Post"
    }
}
