use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::store::filter::validate_field;
use crate::infrastructure::store::{
    Collection, Condition, Document, Filter, InsertOutcome, SortKey, Store, CREATED_AT, ID,
    UPDATED_AT,
};

/// Document store on SQLite. Every collection shares one table; bodies are
/// JSON text and filters compile to `json_extract` predicates.
pub struct SqliteStore {
    pool: SqlitePool,
    ids: Arc<IdGenerator>,
}

pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32, ids: Arc<IdGenerator>) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool, ids };
        store.initialize().await?;
        info!("Document store ready at {} ({} connections)", url, max_connections);
        Ok(store)
    }

    /// Single-connection in-memory database. The connection is pinned so the
    /// database lives as long as the store.
    pub async fn new_in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            ids: Arc::new(IdGenerator::new(0)),
        };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                kind TEXT NOT NULL,
                id INTEGER NOT NULL,
                body TEXT NOT NULL,
                folded TEXT NOT NULL DEFAULT '{}',
                unique_fields TEXT,
                unique_key TEXT,
                PRIMARY KEY (kind, id),
                UNIQUE (kind, unique_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Unavailable(format!("Failed to create documents table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(kind, json_extract(body, '$.createdAt') DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Unavailable(format!("Failed to create created-at index: {}", e)))?;

        Ok(())
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn stamp(&self, doc: &mut Document) {
        if doc.id().is_none() {
            doc.set(ID, self.ids.next_id());
        }
        let now = current_time_millis();
        if !doc.contains(CREATED_AT) {
            doc.set(CREATED_AT, now);
        }
        if !doc.contains(UPDATED_AT) {
            doc.set(UPDATED_AT, now);
        }
    }

    async fn insert_row(
        &self,
        kind: Collection,
        mut doc: Document,
        unique_key_fields: &[&str],
    ) -> AppResult<Document> {
        self.stamp(&mut doc);
        let id = doc
            .id()
            .ok_or_else(|| AppError::invalid("Document id must be an integer"))?;

        let (unique_fields, key) = if unique_key_fields.is_empty() {
            (None, None)
        } else {
            (
                Some(serde_json::to_string(unique_key_fields)?),
                Some(unique_key(&doc, unique_key_fields)?),
            )
        };

        sqlx::query(
            "INSERT INTO documents (kind, id, body, folded, unique_fields, unique_key) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(serde_json::to_string(&doc)?)
        .bind(folded_text(&doc)?)
        .bind(unique_fields)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(doc)
    }
}

/// Canonical key for the unique index: `field=json` pairs in the given order.
fn unique_key(doc: &Document, fields: &[&str]) -> AppResult<String> {
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        validate_field(field)?;
        let value = doc.get(field).cloned().unwrap_or(Value::Null);
        parts.push(format!("{}={}", field, value));
    }
    Ok(parts.join("&"))
}

/// Lowercased copy of the top-level string fields. SQLite only folds ASCII
/// in `LIKE`, so text search runs against this column instead of the body.
fn folded_text(doc: &Document) -> AppResult<String> {
    let folded: serde_json::Map<String, Value> = doc
        .as_map()
        .iter()
        .filter_map(|(field, value)| {
            value
                .as_str()
                .map(|text| (field.clone(), Value::String(text.to_lowercase())))
        })
        .collect();
    Ok(serde_json::to_string(&folded)?)
}

fn field_expr(field: &str) -> AppResult<String> {
    validate_field(field)?;
    if field == ID {
        Ok("id".to_string())
    } else {
        Ok(format!("json_extract(body, '$.{}')", field))
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Bool(b) => qb.push_bind(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => qb.push_bind(i),
            None => qb.push_bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => qb.push_bind(s.clone()),
        other => qb.push_bind(other.to_string()),
    };
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_condition(qb: &mut QueryBuilder<'_, Sqlite>, condition: &Condition) -> AppResult<()> {
    match condition {
        Condition::Eq(field, Value::Null) => {
            qb.push(field_expr(field)?).push(" IS NULL");
        }
        Condition::Eq(field, value) => {
            qb.push(field_expr(field)?).push(" = ");
            push_value(qb, value);
        }
        Condition::In(_, values) if values.is_empty() => {
            qb.push("0 = 1");
        }
        Condition::In(field, values) => {
            qb.push(field_expr(field)?).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, value);
            }
            qb.push(")");
        }
        Condition::Exists(field) => {
            qb.push(field_expr(field)?).push(" IS NOT NULL");
        }
        Condition::TextSearch { fields, needle } => {
            let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
            qb.push("(");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                validate_field(field)?;
                qb.push(format!("json_extract(folded, '$.{}') LIKE ", field));
                qb.push_bind(pattern.clone());
                qb.push(" ESCAPE '\\'");
            }
            if fields.is_empty() {
                qb.push("0 = 1");
            }
            qb.push(")");
        }
        Condition::AnyOf(alternatives) => {
            if alternatives.is_empty() {
                qb.push("0 = 1");
                return Ok(());
            }
            qb.push("(");
            for (i, alternative) in alternatives.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_condition(qb, alternative)?;
            }
            qb.push(")");
        }
    }
    Ok(())
}

fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, kind: Collection, filter: &Filter) -> AppResult<()> {
    qb.push(" WHERE kind = ");
    qb.push_bind(kind.as_str());
    for condition in filter.conditions() {
        qb.push(" AND ");
        push_condition(qb, condition)?;
    }
    Ok(())
}

fn push_order(qb: &mut QueryBuilder<'_, Sqlite>, sort: &[SortKey]) -> AppResult<()> {
    let mut terms = Vec::with_capacity(sort.len() + 1);
    for key in sort {
        terms.push(format!("{} {}", field_expr(&key.field)?, key.direction.as_sql()));
    }
    if !sort.iter().any(|key| key.field == ID) {
        terms.push("id DESC".to_string());
    }
    qb.push(" ORDER BY ").push(terms.join(", "));
    Ok(())
}

fn decode(row: SqliteRow) -> AppResult<Document> {
    let body: String = row.try_get("body")?;
    Ok(serde_json::from_str(&body)?)
}

fn as_sql_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Read-merge-write under `BEGIN IMMEDIATE`. The write lock is taken before
/// the read, so the busy handler covers the whole statement sequence instead
/// of failing on a lock upgrade.
async fn update_immediate(
    pool: &SqlitePool,
    kind: Collection,
    id: i64,
    patch: Document,
) -> AppResult<Option<Document>> {
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    let result = match merge_in_place(&mut conn, kind, id, patch).await {
        Ok(updated) => sqlx::query("COMMIT")
            .execute(&mut *conn)
            .await
            .map(|_| updated)
            .map_err(AppError::from),
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            debug!("Rollback of {} {} failed: {}", kind, id, rollback);
        }
    }
    result
}

async fn merge_in_place(
    conn: &mut SqliteConnection,
    kind: Collection,
    id: i64,
    mut patch: Document,
) -> AppResult<Option<Document>> {
    let row = sqlx::query("SELECT body, unique_fields FROM documents WHERE kind = ? AND id = ?")
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let body: String = row.try_get("body")?;
    let unique_fields: Option<String> = row.try_get("unique_fields")?;
    let mut doc: Document = serde_json::from_str(&body)?;

    patch.remove(ID);
    patch.remove(CREATED_AT);
    doc.merge(patch);
    doc.set(UPDATED_AT, current_time_millis());

    let key = match unique_fields.as_deref() {
        Some(json) => {
            let fields: Vec<String> = serde_json::from_str(json)?;
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            Some(unique_key(&doc, &fields)?)
        }
        None => None,
    };

    sqlx::query("UPDATE documents SET body = ?, folded = ?, unique_key = ? WHERE kind = ? AND id = ?")
        .bind(serde_json::to_string(&doc)?)
        .bind(folded_text(&doc)?)
        .bind(key)
        .bind(kind.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(doc))
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, kind: Collection, id: i64) -> AppResult<Option<Document>> {
        let row = sqlx::query("SELECT body FROM documents WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode).transpose()
    }

    async fn insert(&self, kind: Collection, doc: Document) -> AppResult<Document> {
        self.insert_row(kind, doc, &[]).await
    }

    async fn insert_unique(
        &self,
        kind: Collection,
        doc: Document,
        unique_key_fields: &[&str],
    ) -> AppResult<InsertOutcome> {
        match self.insert_row(kind, doc, unique_key_fields).await {
            Ok(doc) => Ok(InsertOutcome::Inserted(doc)),
            Err(AppError::Conflict(msg)) => {
                debug!("Unique insert into {} rejected: {}", kind, msg);
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        kind: Collection,
        id: i64,
        patch: Document,
    ) -> AppResult<Option<Document>> {
        // Detached so a caller-side timeout cannot drop the connection back
        // into the pool with the transaction still open.
        let pool = self.pool.clone();
        tokio::spawn(async move { update_immediate(&pool, kind, id, patch).await })
            .await
            .map_err(|e| AppError::Internal(format!("Update task failed: {}", e)))?
    }

    async fn increment(
        &self,
        kind: Collection,
        id: i64,
        field: &str,
        delta: i64,
    ) -> AppResult<bool> {
        validate_field(field)?;
        let path = format!("$.{}", field);
        let result = sqlx::query(
            "UPDATE documents SET body = json_set(body, ?, COALESCE(json_extract(body, ?), 0) + ?) WHERE kind = ? AND id = ?",
        )
        .bind(&path)
        .bind(&path)
        .bind(delta)
        .bind(kind.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(
        &self,
        kind: Collection,
        filter: &Filter,
        sort: &[SortKey],
        skip: u64,
        limit: Option<u64>,
    ) -> AppResult<Vec<Document>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT body FROM documents");
        push_where(&mut qb, kind, filter)?;
        push_order(&mut qb, sort)?;

        match limit {
            Some(limit) => {
                qb.push(" LIMIT ");
                qb.push_bind(as_sql_count(limit));
            }
            None if skip > 0 => {
                qb.push(" LIMIT -1");
            }
            None => {}
        }
        if skip > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(as_sql_count(skip));
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(decode).collect()
    }

    async fn count(&self, kind: Collection, filter: &Filter) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS n FROM documents");
        push_where(&mut qb, kind, filter)?;
        let row = qb.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn delete_one(&self, kind: Collection, filter: &Filter) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "DELETE FROM documents WHERE rowid IN (SELECT rowid FROM documents",
        );
        push_where(&mut qb, kind, filter)?;
        qb.push(" ORDER BY id LIMIT 1)");
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
