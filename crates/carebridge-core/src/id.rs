use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Maximum length of a resource id on the wire.
pub const MAX_ID_LEN: usize = 64;

/// Check a resource id against the bounded grammar: ASCII alphanumerics,
/// `-` and `.`, between 1 and 64 characters.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// Validate a resource id, returning `InvalidId` when it violates the grammar.
pub fn validate_id(id: &str) -> Result<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(CoreError::invalid_id(id))
    }
}

/// Generate a fresh resource id (UUID v4, hyphenated form).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("abc123"));
        assert!(is_valid_id("a"));
        assert!(is_valid_id("patient-42.v2"));
        assert!(is_valid_id(&"x".repeat(64)));
    }

    #[test]
    fn test_invalid_ids() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"x".repeat(65)));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id("slash/id"));
        assert!(!is_valid_id("under_score"));
        assert!(!is_valid_id("ümlaut"));
    }

    #[test]
    fn test_validate_id_error() {
        assert!(validate_id("ok-id").is_ok());
        let err = validate_id("bad id").unwrap_err();
        assert!(matches!(err, CoreError::InvalidId(_)));
    }

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert!(is_valid_id(&a));
        assert!(is_valid_id(&b));
        assert_ne!(a, b);
    }
}
