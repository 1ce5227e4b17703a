// EntActor - account profile of anyone who reads or writes

use serde::{Deserialize, Serialize};

use super::{is_unset, Entity};
use crate::infrastructure::store::Collection;

/// Fields any viewer may see. Everything else on the profile is private.
pub const PUBLIC_PROFILE_FIELDS: &[&str] = &["id", "username", "fullName", "avatarUrl"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntActor {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub username: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub updated_at: i64,
}

impl Entity for EntActor {
    const COLLECTION: Collection = Collection::Actors;

    fn label() -> &'static str {
        "Actor"
    }
}
