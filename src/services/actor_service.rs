use serde::Deserialize;
use tracing::info;

use crate::entities::ent_actor::PUBLIC_PROFILE_FIELDS;
use crate::entities::{EntActor, Entity, FULL_NAME, USERNAME};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Document, InsertOutcome, SharedStore};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActor {
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct ActorService {
    store: SharedStore,
}

impl ActorService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Usernames are stored lowercase and must be unique.
    pub async fn register(&self, input: NewActor) -> AppResult<EntActor> {
        let username = USERNAME.validate(&input.username)?.to_lowercase();
        let full_name = FULL_NAME.validate(&input.full_name)?;
        let actor = EntActor {
            id: 0,
            username,
            full_name,
            avatar_url: input.avatar_url.filter(|url| !url.trim().is_empty()),
            email: input.email.map(|email| email.trim().to_lowercase()),
            created_at: 0,
            updated_at: 0,
        };

        match self
            .store
            .insert_unique(EntActor::COLLECTION, Document::from_entity(&actor)?, &["username"])
            .await?
        {
            InsertOutcome::Inserted(doc) => {
                let saved: EntActor = doc.into_entity()?;
                info!(actor_id = saved.id, username = %saved.username, "actor registered");
                Ok(saved)
            }
            InsertOutcome::AlreadyExists => Err(AppError::Conflict(format!(
                "Username {} is already taken",
                actor.username
            ))),
        }
    }

    /// Public profile fields only.
    pub async fn get_public(&self, id: i64) -> AppResult<Document> {
        self.store
            .get(EntActor::COLLECTION, id)
            .await?
            .map(|doc| doc.project(PUBLIC_PROFILE_FIELDS))
            .ok_or_else(|| AppError::not_found(format!("Actor {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::store;

    fn new_actor(username: &str) -> NewActor {
        NewActor {
            username: username.to_string(),
            full_name: "Some One".to_string(),
            email: Some("Some@Example.com".to_string()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_public_profile() {
        let service = ActorService::new(store().await);
        let actor = service.register(new_actor("  Ana ")).await.unwrap();
        assert_eq!(actor.username, "ana");
        assert_eq!(actor.email.as_deref(), Some("some@example.com"));

        let profile = service.get_public(actor.id).await.unwrap();
        assert_eq!(profile.get_str("username"), Some("ana"));
        assert!(profile.get("email").is_none());
        assert!(matches!(service.get_public(999).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let service = ActorService::new(store().await);
        service.register(new_actor("ana")).await.unwrap();
        assert!(matches!(
            service.register(new_actor("ANA")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            service.register(new_actor("a")).await,
            Err(AppError::InvalidArgument(_))
        ));
    }
}
