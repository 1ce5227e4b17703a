use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{SortDirection, SortKey, CREATED_AT};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortRequest {
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
}

impl SortRequest {
    pub fn new(sort_by: &str, sort_type: &str) -> Self {
        Self {
            sort_by: Some(sort_by.to_string()),
            sort_type: Some(sort_type.to_string()),
        }
    }
}

pub const CONTENT_SORTABLE: &[&str] = &["createdAt", "updatedAt", "views", "title", "duration"];
pub const COMMENT_SORTABLE: &[&str] = &["createdAt", "updatedAt"];
pub const POST_SORTABLE: &[&str] = &["createdAt", "updatedAt"];
pub const LIST_SORTABLE: &[&str] = &["createdAt", "updatedAt", "name"];
pub const FOLLOW_SORTABLE: &[&str] = &["createdAt"];
pub const REACTION_SUMMARY_SORTABLE: &[&str] = &["createdAt"];

/// Resolves the requested sort against an allow-list. The result always
/// ends with `id desc` so equal keys keep a stable order.
pub fn resolve_sort(request: &SortRequest, allowed: &[&str]) -> AppResult<Vec<SortKey>> {
    let field = match request.sort_by.as_deref().map(str::trim) {
        None | Some("") => CREATED_AT,
        Some(field) if allowed.contains(&field) => field,
        Some(field) => {
            return Err(AppError::invalid(format!(
                "Cannot sort by {}; allowed: {}",
                field,
                allowed.join(", ")
            )))
        }
    };
    let direction = match request.sort_type.as_deref().map(str::trim) {
        None | Some("") => SortDirection::Desc,
        Some(value) => SortDirection::parse(value)?,
    };
    Ok(vec![SortKey::new(field, direction), SortKey::desc("id")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_created_at_desc_with_id_tiebreak() {
        let keys = resolve_sort(&SortRequest::default(), CONTENT_SORTABLE).unwrap();
        assert_eq!(keys, vec![SortKey::desc("createdAt"), SortKey::desc("id")]);
    }

    #[test]
    fn test_allow_list_is_enforced() {
        let keys = resolve_sort(&SortRequest::new("views", "asc"), CONTENT_SORTABLE).unwrap();
        assert_eq!(keys[0], SortKey::asc("views"));
        assert!(resolve_sort(&SortRequest::new("views", "asc"), COMMENT_SORTABLE).is_err());
        assert!(resolve_sort(&SortRequest::new("email", "desc"), CONTENT_SORTABLE).is_err());
        assert!(resolve_sort(&SortRequest::new("title", "upward"), CONTENT_SORTABLE).is_err());
    }
}
