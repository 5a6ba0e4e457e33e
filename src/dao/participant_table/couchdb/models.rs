use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{ChangeEvent, ParticipantEntity};

use super::error::{CouchDaoError, CouchResult};

/// Prefix of design documents, which never hold participants.
pub const DESIGN_PREFIX: &str = "_design/";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Acknowledgement returned by CouchDB for document writes.
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    pub results: Vec<ChangeRow>,
    pub last_seq: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    pub id: String,
    #[serde(default)]
    pub changes: Vec<ChangeRevision>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRevision {
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchParticipantDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub participant: ParticipantBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantBody {
    pub name: String,
    pub college: String,
    #[serde(default)]
    pub round1: f64,
    #[serde(default)]
    pub round2: f64,
    #[serde(default)]
    pub round3: f64,
    #[serde(default)]
    pub round4: f64,
    #[serde(default)]
    pub round5: f64,
    #[serde(default)]
    pub total_score: f64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl From<ParticipantEntity> for ParticipantBody {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            name: value.name,
            college: value.college,
            round1: value.round1,
            round2: value.round2,
            round3: value.round3,
            round4: value.round4,
            round5: value.round5,
            total_score: value.total_score,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl CouchParticipantDocument {
    pub fn from_entity(entity: ParticipantEntity, rev: Option<String>) -> Self {
        Self {
            id: entity.id.clone(),
            rev,
            participant: entity.into(),
        }
    }

    pub fn into_entity(self) -> ParticipantEntity {
        let body = self.participant;
        ParticipantEntity {
            id: self.id,
            name: body.name,
            college: body.college,
            round1: body.round1,
            round2: body.round2,
            round3: body.round3,
            round4: body.round4,
            round5: body.round5,
            total_score: body.total_score,
            created_at: body.created_at,
            updated_at: body.updated_at,
        }
    }
}

/// Render a `_changes` sequence token as a query parameter value.
pub fn seq_param(seq: &Value) -> String {
    match seq {
        Value::String(token) => token.clone(),
        other => other.to_string(),
    }
}

impl ChangeRow {
    /// Translate a feed row into a change event; design documents yield `None`.
    pub fn into_event(self) -> CouchResult<Option<ChangeEvent>> {
        if self.id.starts_with(DESIGN_PREFIX) {
            return Ok(None);
        }
        if self.deleted {
            return Ok(Some(ChangeEvent::Deleted { id: self.id }));
        }

        let Some(doc) = self.doc else {
            return Ok(None);
        };
        let document: CouchParticipantDocument =
            serde_json::from_value(doc).map_err(|source| CouchDaoError::MalformedDocument {
                id: self.id.clone(),
                source,
            })?;

        let first_revision = self
            .changes
            .first()
            .is_some_and(|change| change.rev.starts_with("1-"));
        let entity = document.into_entity();
        Ok(Some(if first_revision {
            ChangeEvent::Inserted(entity)
        } else {
            ChangeEvent::Updated(entity)
        }))
    }
}
