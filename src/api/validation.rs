use serde_json::Value;

use super::ApiError;
use crate::models::result::ResultFilters;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

pub fn validate_page(page: u64) -> Result<u64, ApiError> {
    if page == 0 {
        return Err(ApiError::validation(
            "Invalid page: 0. Pages start at 1",
        ));
    }
    Ok(page)
}

pub fn validate_page_size(page_size: u64) -> Result<u64, ApiError> {
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::validation(format!(
            "Invalid page_size: {page_size}. Must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok(page_size)
}

pub fn validate_id(kind: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {kind} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_message(message: &str) -> Result<&str, ApiError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Message cannot be empty"));
    }
    Ok(trimmed)
}

/// Parses a filter object; unknown keys and non-string values are rejected.
/// `state` and `status` name the same filter; both may be sent only if they agree.
pub fn merge_status(
    state: Option<String>,
    status: Option<String>,
) -> Result<Option<String>, ApiError> {
    match (state, status) {
        (Some(a), Some(b)) if a != b => Err(ApiError::validation(format!(
            "Conflicting values for 'state' ('{a}') and 'status' ('{b}')"
        ))),
        (a, b) => Ok(a.or(b)),
    }
}

pub fn parse_filters(value: Option<Value>) -> Result<ResultFilters, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(ResultFilters::default()),
        Some(value @ Value::Object(_)) => serde_json::from_value::<ResultFilters>(value)
            .map(|filters| filters.normalized())
            .map_err(|e| ApiError::validation(format!("Invalid filters: {e}"))),
        Some(_) => Err(ApiError::validation("filters must be an object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_page_size() {
        assert!(validate_page_size(1).is_ok());
        assert!(validate_page_size(100).is_ok());
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(101).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1).is_ok());
        assert!(validate_page(0).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("item", 4).is_ok());
        assert!(validate_id("item", 0).is_err());
        assert!(validate_id("item", -3).is_err());
    }

    #[test]
    fn test_merge_status() {
        let some = |v: &str| Some(v.to_string());
        assert_eq!(merge_status(some("Activo"), None).unwrap(), some("Activo"));
        assert_eq!(merge_status(None, some("Activo")).unwrap(), some("Activo"));
        assert_eq!(merge_status(some("Activo"), some("Activo")).unwrap(), some("Activo"));
        assert_eq!(merge_status(None, None).unwrap(), None);
        assert!(merge_status(some("Activo"), some("Completado")).is_err());
    }

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(Some(json!({"country": "ES", "status": "", "language": null})))
            .unwrap();
        assert_eq!(filters.country.as_deref(), Some("ES"));
        assert!(filters.status.is_none());
        assert!(filters.language.is_none());

        assert!(parse_filters(None).unwrap().is_empty());
        assert!(parse_filters(Some(json!({"colour": "red"}))).is_err());
        assert!(parse_filters(Some(json!({"country": 3}))).is_err());
        assert!(parse_filters(Some(json!(["ES"]))).is_err());
    }
}
