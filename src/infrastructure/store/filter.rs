use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, AppResult};

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Field names end up inside JSON paths, so only plain identifiers pass.
pub fn validate_field(field: &str) -> AppResult<()> {
    if FIELD_NAME.is_match(field) {
        Ok(())
    } else {
        Err(AppError::invalid(format!("Invalid field name: {}", field)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value; `Value::Null` matches absent fields.
    Eq(String, Value),
    /// Field equals one of the values. An empty set matches nothing.
    In(String, Vec<Value>),
    Exists(String),
    /// Case-insensitive substring match on any of the fields.
    TextSearch { fields: Vec<String>, needle: String },
    /// At least one nested condition holds.
    AnyOf(Vec<Condition>),
}

/// Conjunction of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn exists(mut self, field: &str) -> Self {
        self.conditions.push(Condition::Exists(field.to_string()));
        self
    }

    pub fn text_search(mut self, fields: &[&str], needle: &str) -> Self {
        self.conditions.push(Condition::TextSearch {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            needle: needle.to_string(),
        });
        self
    }

    pub fn any_of(mut self, alternatives: Vec<Condition>) -> Self {
        self.conditions.push(Condition::AnyOf(alternatives));
        self
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(SortDirection::Asc),
            "desc" | "descending" | "-1" => Ok(SortDirection::Desc),
            other => Err(AppError::invalid(format!("Unknown sort direction: {}", other))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    pub fn asc(field: &str) -> Self {
        Self::new(field, SortDirection::Asc)
    }
}
