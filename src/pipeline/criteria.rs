// Filter criteria as received from the transport: string keys and values,
// checked against each resource's accepted keys.

use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

pub type FilterCriteria = BTreeMap<String, String>;

/// Rejects any key outside `accepted`.
pub fn ensure_known_keys(criteria: &FilterCriteria, accepted: &[&str]) -> AppResult<()> {
    match criteria.keys().find(|key| !accepted.contains(&key.as_str())) {
        Some(key) => Err(AppError::invalid(format!(
            "Unknown filter '{}'; accepted: {}",
            key,
            accepted.join(", ")
        ))),
        None => Ok(()),
    }
}

pub fn parse_id(field: &str, raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::invalid(format!("Invalid {}: '{}'", field, raw))),
    }
}

/// Parsed id for `field`, if present.
pub fn optional_id(criteria: &FilterCriteria, field: &str) -> AppResult<Option<i64>> {
    criteria
        .get(field)
        .map(|raw| parse_id(field, raw))
        .transpose()
}

pub fn required_id(criteria: &FilterCriteria, field: &str) -> AppResult<i64> {
    optional_id(criteria, field)?
        .ok_or_else(|| AppError::invalid(format!("Filter '{}' is required", field)))
}

/// Non-blank text for `field`. Blank values count as absent.
pub fn optional_text<'a>(criteria: &'a FilterCriteria, field: &str) -> Option<&'a str> {
    criteria
        .get(field)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// The single key present out of `choices`; none or several is an error.
pub fn exactly_one<'a>(criteria: &FilterCriteria, choices: &[&'a str]) -> AppResult<&'a str> {
    let present: Vec<&'a str> = choices
        .iter()
        .copied()
        .filter(|choice| criteria.contains_key(*choice))
        .collect();
    match present.as_slice() {
        [one] => Ok(*one),
        _ => Err(AppError::invalid(format!(
            "Exactly one of {} is required",
            choices.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(pairs: &[(&str, &str)]) -> FilterCriteria {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_ids_must_be_positive_integers() {
        assert_eq!(parse_id("ownerId", "42").unwrap(), 42);
        assert!(parse_id("ownerId", "0").is_err());
        assert!(parse_id("ownerId", "-1").is_err());
        assert!(parse_id("ownerId", "abc").is_err());
        assert!(parse_id("ownerId", "").is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let c = criteria(&[("ownerId", "1"), ("color", "red")]);
        assert!(ensure_known_keys(&c, &["ownerId"]).is_err());
        assert!(ensure_known_keys(&c, &["ownerId", "color"]).is_ok());
    }

    #[test]
    fn test_exactly_one_and_blank_text() {
        let c = criteria(&[("postId", "3"), ("query", "  ")]);
        assert_eq!(exactly_one(&c, &["contentId", "postId"]).unwrap(), "postId");
        assert!(exactly_one(&c, &["contentId", "commentId"]).is_err());
        assert_eq!(optional_text(&c, "query"), None);
    }
}
