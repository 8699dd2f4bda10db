//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a game id can be used verbatim as a single URL path segment.
///
/// Only unreserved URL characters are accepted (ASCII letters, digits, `-`,
/// `_`, `.` and `~`), and `.` or `..` alone are rejected.
///
/// # Examples
///
/// ```ignore
/// validate_game_id("g1")        // Ok
/// validate_game_id("")          // Err - empty
/// validate_game_id("g1/turns")  // Err - slash
/// validate_game_id("123#x")     // Err - fragment delimiter
/// validate_game_id("..")        // Err - dot segment
/// ```
pub fn validate_game_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        let mut err = ValidationError::new("game_id_empty");
        err.message = Some("Game ID must not be empty".into());
        return Err(err);
    }

    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
    if !id.chars().all(unreserved) || id == "." || id == ".." {
        let mut err = ValidationError::new("game_id_format");
        err.message = Some(
            "Game ID may only contain ASCII letters, digits, '-', '_', '.' and '~'".into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a text field holds something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_game_id_valid() {
        assert!(validate_game_id("g1").is_ok());
        assert!(validate_game_id("123456").is_ok());
        assert!(validate_game_id("abc-DEF_42").is_ok());
    }

    #[test]
    fn test_validate_game_id_invalid() {
        assert!(validate_game_id("").is_err());
        assert!(validate_game_id("g1/turns").is_err());
        assert!(validate_game_id("g 1").is_err());
        assert!(validate_game_id("g1\n").is_err());
        for id in ["123#x", "123?x", "50%25", "..", ".", "é1"] {
            assert!(validate_game_id(id).is_err(), "{id} accepted");
        }
        assert!(validate_game_id("v1.2~beta").is_ok());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("AliceWeb").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
    }
}
