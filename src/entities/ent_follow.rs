// EntFollow - follower -> followee link

use serde::{Deserialize, Serialize};

use super::{is_unset, Entity};
use crate::infrastructure::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntFollow {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i64,
    pub follower_id: i64,
    pub followee_id: i64,
    #[serde(default, skip_serializing_if = "is_unset")]
    pub created_at: i64,
}

impl EntFollow {
    pub const UNIQUE_KEY: &'static [&'static str] = &["followerId", "followeeId"];

    pub fn new(follower_id: i64, followee_id: i64) -> Self {
        Self {
            id: 0,
            follower_id,
            followee_id,
            created_at: 0,
        }
    }
}

impl Entity for EntFollow {
    const COLLECTION: Collection = Collection::Follows;

    fn label() -> &'static str {
        "Follow"
    }
}
