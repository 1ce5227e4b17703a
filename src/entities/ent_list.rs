// EntList - named, ordered set of content items owned by one actor

use serde::{Deserialize, Serialize};

use super::{is_unset, Entity};
use crate::infrastructure::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntList {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub updated_at: i64,
}

impl EntList {
    /// Names are unique per owner.
    pub const UNIQUE_KEY: &'static [&'static str] = &["ownerId", "name"];
}

impl Entity for EntList {
    const COLLECTION: Collection = Collection::Lists;

    fn label() -> &'static str {
        "List"
    }
}

/// One member of a list. Entries are ordered by insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntListEntry {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub list_id: i64,
    pub content_id: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
}

impl EntListEntry {
    pub const UNIQUE_KEY: &'static [&'static str] = &["listId", "contentId"];
}

impl Entity for EntListEntry {
    const COLLECTION: Collection = Collection::ListEntries;

    fn label() -> &'static str {
        "List entry"
    }
}
