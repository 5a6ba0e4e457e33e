//! Shared-code gate in front of the admin surface. A convenience, not a security boundary.

use crate::{error::ServiceError, state::SharedState};

const INVALID_CODE: &str = "Invalid code";

/// Compare `code` with the configured shared code.
pub fn verify(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    if codes_match(code.as_bytes(), state.config().admin_code().as_bytes()) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(INVALID_CODE.into()))
    }
}

/// Byte comparison whose duration does not depend on where the inputs differ.
fn codes_match(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Milliseconds a denial message should stay visible.
pub fn clear_after_ms(state: &SharedState) -> u64 {
    u64::try_from(state.config().access_error_clear_after().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[test]
    fn only_the_configured_code_is_accepted() {
        let state = AppState::new(AppConfig::default().with_admin_code("4321"));

        assert!(verify(&state, "4321").is_ok());
        let err = verify(&state, "1234").unwrap_err();
        assert_eq!(err.to_string(), "Invalid code");
        assert!(verify(&state, "").is_err());
        assert_eq!(clear_after_ms(&state), 3_000);
    }

    #[test]
    fn code_comparison_handles_length_and_content() {
        assert!(codes_match(b"2468", b"2468"));
        assert!(!codes_match(b"2468", b"2469"));
        assert!(!codes_match(b"246", b"2468"));
        assert!(codes_match(b"", b""));
    }
}
