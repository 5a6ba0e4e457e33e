use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Number of scored rounds every participant competes in.
pub const ROUND_COUNT: usize = 5;

/// Participant record as stored by the remote table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantEntity {
    /// Opaque identifier assigned by the remote table on insert.
    pub id: String,
    /// Display name of the entrant.
    pub name: String,
    /// College the entrant represents.
    pub college: String,
    /// Score of round 1.
    pub round1: f64,
    /// Score of round 2.
    pub round2: f64,
    /// Score of round 3.
    pub round3: f64,
    /// Score of round 4.
    pub round4: f64,
    /// Score of round 5.
    pub round5: f64,
    /// Total as stored remotely. Readers recompute it from the rounds.
    pub total_score: f64,
    /// Creation timestamp set by the remote table.
    pub created_at: SystemTime,
    /// Last successful update write.
    pub updated_at: SystemTime,
}

impl ParticipantEntity {
    /// Round scores in order.
    pub fn rounds(&self) -> [f64; ROUND_COUNT] {
        [
            self.round1,
            self.round2,
            self.round3,
            self.round4,
            self.round5,
        ]
    }

    /// Sum of the five round scores.
    pub fn computed_total(&self) -> f64 {
        self.rounds().iter().sum()
    }

    /// Build the stored record for a freshly inserted participant.
    pub fn from_new(id: String, new: NewParticipantEntity, now: SystemTime) -> Self {
        let mut entity = Self {
            id,
            name: new.name,
            college: new.college,
            round1: new.round1,
            round2: new.round2,
            round3: new.round3,
            round4: new.round4,
            round5: new.round5,
            total_score: 0.0,
            created_at: now,
            updated_at: now,
        };
        entity.total_score = entity.computed_total();
        entity
    }
}

/// Insert payload: everything the remote table does not assign itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewParticipantEntity {
    /// Display name of the participant.
    pub name: String,
    /// College the participant represents.
    pub college: String,
    /// Score of round 1.
    pub round1: f64,
    /// Score of round 2.
    pub round2: f64,
    /// Score of round 3.
    pub round3: f64,
    /// Score of round 4.
    pub round4: f64,
    /// Score of round 5.
    pub round5: f64,
}

/// Partial update; `None` fields are left untouched remotely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantPatchEntity {
    /// New display name.
    pub name: Option<String>,
    /// New college.
    pub college: Option<String>,
    /// New score of round 1.
    pub round1: Option<f64>,
    /// New score of round 2.
    pub round2: Option<f64>,
    /// New score of round 3.
    pub round3: Option<f64>,
    /// New score of round 4.
    pub round4: Option<f64>,
    /// New score of round 5.
    pub round5: Option<f64>,
    /// Always stamped by the caller at write time.
    pub updated_at: SystemTime,
}

impl ParticipantPatchEntity {
    /// Overlay the supplied fields on `entity` and refresh its stored total.
    pub fn apply_to(&self, entity: &mut ParticipantEntity) {
        if let Some(name) = &self.name {
            entity.name = name.clone();
        }
        if let Some(college) = &self.college {
            entity.college = college.clone();
        }
        let slots = [
            (&mut entity.round1, self.round1),
            (&mut entity.round2, self.round2),
            (&mut entity.round3, self.round3),
            (&mut entity.round4, self.round4),
            (&mut entity.round5, self.round5),
        ];
        for (slot, value) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }
        entity.updated_at = self.updated_at;
        entity.total_score = entity.computed_total();
    }
}

/// Change notification delivered by the remote push feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A record was created by any client.
    Inserted(ParticipantEntity),
    /// A record was modified by any client.
    Updated(ParticipantEntity),
    /// A record was removed; only its identifier survives.
    Deleted { id: String },
}

impl ChangeEvent {
    /// Identifier of the record the event refers to.
    pub fn id(&self) -> &str {
        match self {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => &record.id,
            ChangeEvent::Deleted { id } => id,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted(_) => "insert",
            ChangeEvent::Updated(_) => "update",
            ChangeEvent::Deleted { .. } => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_participant() -> NewParticipantEntity {
        NewParticipantEntity {
            name: "Asha".into(),
            college: "North".into(),
            round1: 5.0,
            round2: 2.5,
            round3: 0.0,
            round4: 1.0,
            round5: 0.0,
        }
    }

    #[test]
    fn from_new_stores_total() {
        let entity = ParticipantEntity::from_new("p1".into(), new_participant(), SystemTime::now());
        assert_eq!(entity.total_score, 8.5);
        assert_eq!(entity.created_at, entity.updated_at);
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let created = SystemTime::UNIX_EPOCH;
        let mut entity = ParticipantEntity::from_new("p1".into(), new_participant(), created);
        let later = SystemTime::now();
        let patch = ParticipantPatchEntity {
            name: None,
            college: Some("South".into()),
            round1: None,
            round2: None,
            round3: Some(4.0),
            round4: None,
            round5: None,
            updated_at: later,
        };

        patch.apply_to(&mut entity);

        assert_eq!(entity.name, "Asha");
        assert_eq!(entity.college, "South");
        assert_eq!(entity.round1, 5.0);
        assert_eq!(entity.round3, 4.0);
        assert_eq!(entity.total_score, 12.5);
        assert_eq!(entity.created_at, created);
        assert_eq!(entity.updated_at, later);
    }
}
