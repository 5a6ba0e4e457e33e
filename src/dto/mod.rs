use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Admin gate payloads.
pub mod admin;
/// Health check payload.
pub mod health;
/// Participant views and write requests.
pub mod participant;
/// Reveal views.
pub mod reveal;
/// Score display formatting.
pub mod score;
/// Server-sent event payloads.
pub mod sse;
/// Field validators shared by request payloads.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
