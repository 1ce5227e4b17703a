// Deadline decorator: wraps any store so that no call outlives the configured
// timeout. An expired call fails with `Unavailable`; whatever the inner store
// already committed stays committed.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{
    Collection, Document, Filter, InsertOutcome, SharedStore, SortKey, Store,
};

pub struct TimeoutStore {
    inner: SharedStore,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: SharedStore, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        kind: Collection,
        fut: impl Future<Output = AppResult<T>> + Send,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    collection = kind.as_str(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "store call timed out"
                );
                Err(AppError::Unavailable(format!(
                    "{} on {} exceeded {:?}",
                    operation, kind, self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl Store for TimeoutStore {
    async fn get(&self, kind: Collection, id: i64) -> AppResult<Option<Document>> {
        self.bounded("get", kind, self.inner.get(kind, id)).await
    }

    async fn insert(&self, kind: Collection, doc: Document) -> AppResult<Document> {
        self.bounded("insert", kind, self.inner.insert(kind, doc)).await
    }

    async fn insert_unique(
        &self,
        kind: Collection,
        doc: Document,
        unique_key_fields: &[&str],
    ) -> AppResult<InsertOutcome> {
        self.bounded(
            "insert_unique",
            kind,
            self.inner.insert_unique(kind, doc, unique_key_fields),
        )
        .await
    }

    async fn update(
        &self,
        kind: Collection,
        id: i64,
        patch: Document,
    ) -> AppResult<Option<Document>> {
        self.bounded("update", kind, self.inner.update(kind, id, patch)).await
    }

    async fn increment(
        &self,
        kind: Collection,
        id: i64,
        field: &str,
        delta: i64,
    ) -> AppResult<bool> {
        self.bounded("increment", kind, self.inner.increment(kind, id, field, delta))
            .await
    }

    async fn find(
        &self,
        kind: Collection,
        filter: &Filter,
        sort: &[SortKey],
        skip: u64,
        limit: Option<u64>,
    ) -> AppResult<Vec<Document>> {
        self.bounded("find", kind, self.inner.find(kind, filter, sort, skip, limit))
            .await
    }

    async fn count(&self, kind: Collection, filter: &Filter) -> AppResult<u64> {
        self.bounded("count", kind, self.inner.count(kind, filter)).await
    }

    async fn delete_one(&self, kind: Collection, filter: &Filter) -> AppResult<u64> {
        self.bounded("delete_one", kind, self.inner.delete_one(kind, filter))
            .await
    }
}
