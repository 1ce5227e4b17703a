// Store - persistence interface shared by the pipeline builder, the toggle
// engine and the services. All cross-record invariants (relationship
// uniqueness, list membership, list names) live in the store's unique index.

pub mod document;
pub mod filter;
pub mod sqlite_store;
pub mod timeout;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AppResult;

pub use document::{Collection, Document, CREATED_AT, ID, UPDATED_AT};
pub use filter::{Condition, Filter, SortDirection, SortKey};
pub use sqlite_store::SqliteStore;
pub use timeout::TimeoutStore;

/// Result of an insert guarded by a unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Document),
    /// A record with the same key values already exists.
    AlreadyExists,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, kind: Collection, id: i64) -> AppResult<Option<Document>>;

    /// Insert a record. Missing `id`, `createdAt` and `updatedAt` are stamped.
    async fn insert(&self, kind: Collection, doc: Document) -> AppResult<Document>;

    /// Insert a record unless one with equal values for `unique_key_fields`
    /// exists in the same collection. The check is the store's unique index,
    /// so concurrent callers cannot both insert.
    async fn insert_unique(
        &self,
        kind: Collection,
        doc: Document,
        unique_key_fields: &[&str],
    ) -> AppResult<InsertOutcome>;

    /// Merge `patch` into the record and bump `updatedAt`. Returns the merged
    /// record, or `None` when no record has that id. Fails with `Conflict`
    /// when the merge collides with another record's unique key.
    async fn update(&self, kind: Collection, id: i64, patch: Document)
        -> AppResult<Option<Document>>;

    /// Atomically add `delta` to a numeric field. Returns false when no
    /// record has that id.
    async fn increment(&self, kind: Collection, id: i64, field: &str, delta: i64)
        -> AppResult<bool>;

    /// Matching records ordered by `sort`, then by id descending.
    async fn find(
        &self,
        kind: Collection,
        filter: &Filter,
        sort: &[SortKey],
        skip: u64,
        limit: Option<u64>,
    ) -> AppResult<Vec<Document>>;

    async fn count(&self, kind: Collection, filter: &Filter) -> AppResult<u64>;

    /// Delete at most one matching record; returns the number deleted.
    async fn delete_one(&self, kind: Collection, filter: &Filter) -> AppResult<u64>;
}

pub type SharedStore = Arc<dyn Store>;
