//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Largest number of tags accepted in one invalidation call.
pub const MAX_TAGS: usize = 100;

/// Request body for bulk invalidation (POST /cache/invalidate)
///
/// # Fields
/// - `tags`: Key patterns under the store prefix, e.g. `api:categories:no-params`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub tags: Vec<String>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.tags.is_empty() {
            return Some("At least one tag is required".to_string());
        }
        if self.tags.len() > MAX_TAGS {
            return Some(format!("At most {} tags per request", MAX_TAGS));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Some("Tags cannot be empty".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_request_deserialize() {
        let json = r#"{"tags": ["api:videos:no-params", "analytics"]}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.tags.len(), 2);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_missing_tags_defaults_to_empty() {
        let req: InvalidateRequest = serde_json::from_str("{}").unwrap();
        assert!(req.tags.is_empty());
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_blank_tag() {
        let req = InvalidateRequest {
            tags: vec!["ok".to_string(), " ".to_string()],
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_too_many_tags() {
        let req = InvalidateRequest {
            tags: (0..=MAX_TAGS).map(|i| i.to_string()).collect(),
        };
        assert!(req.validate().is_some());
    }
}
