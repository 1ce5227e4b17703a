// EntContent - a published (or draft) video-style content item

use serde::{Deserialize, Serialize};

use super::{is_unset, Entity};
use crate::infrastructure::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntContent {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    /// Location handed out by the asset store; never fetched here.
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub views: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub updated_at: i64,
}

impl EntContent {
    /// Published items are visible to everyone, drafts only to their owner.
    pub fn is_visible_to(&self, viewer_id: Option<i64>) -> bool {
        self.is_published || viewer_id == Some(self.owner_id)
    }
}

impl Entity for EntContent {
    const COLLECTION: Collection = Collection::Content;

    fn label() -> &'static str {
        "Content"
    }
}

/// Membership of a content item in an actor's watch history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntWatchEntry {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub actor_id: i64,
    pub content_id: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
}

impl EntWatchEntry {
    pub const UNIQUE_KEY: &'static [&'static str] = &["actorId", "contentId"];
}

impl Entity for EntWatchEntry {
    const COLLECTION: Collection = Collection::WatchHistory;

    fn label() -> &'static str {
        "Watch entry"
    }
}
