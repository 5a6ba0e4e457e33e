//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Code typed into the admin gate.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessRequest {
    /// Code as typed.
    pub code: String,
}

/// Outcome of an admin gate attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessResponse {
    /// Whether the code matched.
    pub granted: bool,
    /// Reason for a denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// How long the denial message should stay visible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_after_ms: Option<u64>,
}

impl AccessResponse {
    /// Successful attempt.
    pub fn granted() -> Self {
        Self {
            granted: true,
            message: None,
            clear_after_ms: None,
        }
    }

    /// Failed attempt with the message to show and how long to show it.
    pub fn denied(message: String, clear_after_ms: u64) -> Self {
        Self {
            granted: false,
            message: Some(message),
            clear_after_ms: Some(clear_after_ms),
        }
    }
}
