use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    content_interface::ContentInterface,
    infrastructure::{IdGenerator, SharedStore, SqliteStore, TimeoutStore},
};

#[derive(Clone)]
pub struct AppState {
    pub content_interface: ContentInterface,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize the document store; every call is bounded by the timeout decorator
        let ids = Arc::new(IdGenerator::new(config.database.node_id));
        let sqlite = SqliteStore::connect(
            &config.database.url,
            config.database.max_connections,
            ids,
        )
        .await?;
        sqlite.health_check().await?;

        let store: SharedStore = Arc::new(TimeoutStore::new(
            Arc::new(sqlite),
            config.database.store_timeout(),
        ));
        info!(
            timeout_ms = config.database.store_timeout_ms,
            "store ready"
        );

        let content_interface = ContentInterface::new(store, config.query.clone());

        Ok(Self {
            content_interface,
            config,
        })
    }
}
