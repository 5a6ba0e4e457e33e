//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a required text field contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a round score is a finite, non-negative number.
///
/// # Examples
///
/// ```ignore
/// validate_round_score(7.5)  // Ok
/// validate_round_score(-1.0) // Err - negative
/// ```
pub fn validate_round_score(score: f64) -> Result<(), ValidationError> {
    if !score.is_finite() {
        let mut err = ValidationError::new("round_score_finite");
        err.message = Some("Round score must be a finite number".into());
        return Err(err);
    }
    if score < 0.0 {
        let mut err = ValidationError::new("round_score_negative");
        err.message = Some(format!("Round score must not be negative (got {score})").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Asha").is_ok());
        assert!(validate_not_blank(" x ").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
    }

    #[test]
    fn test_validate_round_score() {
        assert!(validate_round_score(0.0).is_ok());
        assert!(validate_round_score(9.5).is_ok());
        assert!(validate_round_score(-0.5).is_err());
        assert!(validate_round_score(f64::NAN).is_err());
        assert!(validate_round_score(f64::INFINITY).is_err());
    }
}
