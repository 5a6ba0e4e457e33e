//! Failures of the CouchDB participant table.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for CouchDB participant operations.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Participant table operation a CouchDB request belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouchOp {
    /// Check or create the participant database.
    EnsureDatabase,
    /// Read every participant document through `_all_docs`.
    ListParticipants,
    /// Read a single participant document.
    ReadParticipant,
    /// Create or replace a participant document.
    WriteParticipant,
    /// Delete a participant revision.
    DeleteParticipant,
    /// Longpoll the `_changes` feed.
    PollChanges,
}

impl fmt::Display for CouchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CouchOp::EnsureDatabase => "ensure participant database",
            CouchOp::ListParticipants => "list participants",
            CouchOp::ReadParticipant => "read participant",
            CouchOp::WriteParticipant => "write participant",
            CouchOp::DeleteParticipant => "delete participant",
            CouchOp::PollChanges => "poll participant changes",
        })
    }
}

/// Failures that can occur while talking to the participant database.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// A configuration value could not be used.
    #[error("invalid CouchDB setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    /// Building the HTTP client failed.
    #[error("failed to build CouchDB client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an answer.
    #[error("CouchDB request failed ({op})")]
    Transport {
        op: CouchOp,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered with a status the operation does not handle.
    #[error("CouchDB answered {status} ({op})")]
    Status { op: CouchOp, status: StatusCode },
    /// The response body was not the expected JSON.
    #[error("undecodable CouchDB response ({op})")]
    Decode {
        op: CouchOp,
        #[source]
        source: reqwest::Error,
    },
    /// A stored document does not look like a participant.
    #[error("document `{id}` is not a participant")]
    MalformedDocument {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    /// The participant document does not exist or was deleted.
    #[error("participant `{id}` not found")]
    ParticipantMissing { id: String },
    /// Every read-modify-write attempt lost the revision race.
    #[error("participant `{id}` kept conflicting after {attempts} attempt(s)")]
    RevisionConflict { id: String, attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let err = CouchDaoError::Status {
            op: CouchOp::PollChanges,
            status: StatusCode::BAD_GATEWAY,
        };
        assert_eq!(
            err.to_string(),
            "CouchDB answered 502 Bad Gateway (poll participant changes)"
        );

        let err = CouchDaoError::RevisionConflict {
            id: "p1".into(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "participant `p1` kept conflicting after 3 attempt(s)"
        );
    }
}
