use mongodb::{
    bson::{DateTime, Document, doc},
    change_stream::event::OperationType,
};
use serde::{Deserialize, Serialize};

use crate::dao::models::{ChangeEvent, ParticipantEntity, ParticipantPatchEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    college: String,
    #[serde(default)]
    round1: f64,
    #[serde(default)]
    round2: f64,
    #[serde(default)]
    round3: f64,
    #[serde(default)]
    round4: f64,
    #[serde(default)]
    round5: f64,
    #[serde(default)]
    total_score: f64,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            college: value.college,
            round1: value.round1,
            round2: value.round2,
            round3: value.round3,
            round4: value.round4,
            round5: value.round5,
            total_score: value.total_score,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            college: value.college,
            round1: value.round1,
            round2: value.round2,
            round3: value.round3,
            round4: value.round4,
            round5: value.round5,
            total_score: value.total_score,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

/// Update pipeline setting the supplied fields, then recomputing the stored total
/// from the resulting rounds on the server.
pub fn update_pipeline(patch: &ParticipantPatchEntity) -> Vec<Document> {
    let mut set = Document::new();
    if let Some(name) = &patch.name {
        set.insert("name", name.as_str());
    }
    if let Some(college) = &patch.college {
        set.insert("college", college.as_str());
    }
    let rounds = [
        ("round1", patch.round1),
        ("round2", patch.round2),
        ("round3", patch.round3),
        ("round4", patch.round4),
        ("round5", patch.round5),
    ];
    for (field, value) in rounds {
        if let Some(value) = value {
            set.insert(field, value);
        }
    }
    set.insert("updated_at", DateTime::from_system_time(patch.updated_at));

    vec![
        doc! { "$set": set },
        doc! { "$set": { "total_score": { "$add": ["$round1", "$round2", "$round3", "$round4", "$round5"] } } },
    ]
}

/// Map the parts of a change stream event onto a feed event.
pub fn change_from_parts(
    operation: OperationType,
    full_document: Option<MongoParticipantDocument>,
    document_key: Option<Document>,
) -> Option<ChangeEvent> {
    match operation {
        OperationType::Insert => full_document.map(|doc| ChangeEvent::Inserted(doc.into())),
        OperationType::Update | OperationType::Replace => {
            full_document.map(|doc| ChangeEvent::Updated(doc.into()))
        }
        OperationType::Delete => document_key
            .as_ref()
            .and_then(|key| key.get_str("_id").ok())
            .map(|id| ChangeEvent::Deleted { id: id.to_string() }),
        _ => None,
    }
}
