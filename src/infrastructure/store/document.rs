use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{AppError, AppResult};

pub const ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Logical collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Actors,
    Content,
    Comments,
    Reactions,
    Follows,
    Lists,
    ListEntries,
    Posts,
    WatchHistory,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Actors => "actors",
            Collection::Content => "content",
            Collection::Comments => "comments",
            Collection::Reactions => "reactions",
            Collection::Follows => "follows",
            Collection::Lists => "lists",
            Collection::ListEntries => "list_entries",
            Collection::Posts => "posts",
            Collection::WatchHistory => "watch_history",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schemaless record as stored and as returned by queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_entity<T: Serialize>(entity: &T) -> AppResult<Self> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(AppError::Internal(format!(
                "entity did not serialize to an object: {}",
                other
            ))),
        }
    }

    pub fn into_entity<T: DeserializeOwned>(self) -> AppResult<T> {
        Ok(serde_json::from_value(Value::Object(self.0))?)
    }

    pub fn id(&self) -> Option<i64> {
        self.get_i64(ID)
    }

    pub fn created_at(&self) -> i64 {
        self.get_i64(CREATED_AT).unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.0.get_mut(field)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(|v| !v.is_null())
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Shallow merge; `null` values in the patch remove the field.
    pub fn merge(&mut self, patch: Document) {
        for (key, value) in patch.0 {
            if value.is_null() {
                self.0.remove(&key);
            } else {
                self.0.insert(key, value);
            }
        }
    }

    /// Copy of the listed fields only. Absent fields stay absent.
    pub fn project(&self, fields: &[&str]) -> Document {
        let mut out = Map::new();
        for field in fields {
            if let Some(value) = self.0.get(*field) {
                out.insert((*field).to_string(), value.clone());
            }
        }
        Document(out)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}
