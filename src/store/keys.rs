//! Key Builder Module
//!
//! Namespaced key construction: `<prefix>:<part>:<part>...`.

/// Separator between key segments.
pub const KEY_SEPARATOR: &str = ":";

/// Top-level namespace used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "video-directory";

// == Key Builder ==
/// Joins key parts under a fixed top-level prefix.
///
/// Parts are concatenated literally; nothing is escaped or hashed, so a part
/// containing the separator reads the same as two parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // == Key ==
    /// Builds `<prefix>:<parts joined by ':'>`.
    pub fn key<S: AsRef<str>>(&self, parts: &[S]) -> String {
        let mut key = self.prefix.clone();
        for part in parts {
            key.push_str(KEY_SEPARATOR);
            key.push_str(part.as_ref());
        }
        key
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix() {
        let keys = KeyBuilder::default();
        assert_eq!(keys.key(&["api", "videos"]), "video-directory:api:videos");
    }

    #[test]
    fn test_custom_prefix() {
        let keys = KeyBuilder::new("staging");
        assert_eq!(keys.key(&["analytics"]), "staging:analytics");
    }

    #[test]
    fn test_no_parts_yields_prefix() {
        let keys = KeyBuilder::new("p");
        let empty: [&str; 0] = [];
        assert_eq!(keys.key(&empty), "p");
    }

    #[test]
    fn test_parts_are_not_escaped() {
        let keys = KeyBuilder::default();
        assert_eq!(keys.key(&["a:b"]), keys.key(&["a", "b"]));
    }
}
