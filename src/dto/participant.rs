//! Participant payloads exchanged with the scoreboard and admin surfaces.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{NewParticipantEntity, ParticipantPatchEntity},
    dto::{
        format_system_time,
        score::format_score,
        validation::{validate_not_blank, validate_round_score},
    },
    state::participants::{Participant, ParticipantStore},
};

/// Ranked participant as rendered by scoreboard tables.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantView {
    /// Identifier assigned by the remote table.
    pub id: String,
    /// 1-based rank, ties broken by the order the table returned.
    pub rank: usize,
    /// Display name.
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
    /// Sum of the five rounds.
    pub total_score: f64,
    /// `total_score` formatted for display ("7", "7.5").
    pub total_score_display: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Last update time, RFC 3339.
    pub updated_at: String,
}

impl From<&Participant> for ParticipantView {
    fn from(value: &Participant) -> Self {
        let [round1, round2, round3, round4, round5] = value.rounds;
        Self {
            id: value.id.clone(),
            rank: value.rank,
            name: value.name.clone(),
            college: value.college.clone(),
            round1,
            round2,
            round3,
            round4,
            round5,
            total_score: value.total_score,
            total_score_display: format_score(value.total_score),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Full scoreboard state, also broadcast as `scoreboard.updated`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreboardResponse {
    /// Participants in rank order.
    pub participants: Vec<ParticipantView>,
    /// A full read is in flight.
    pub loading: bool,
    /// Latest failure; cleared by the next successful load.
    pub error: Option<String>,
    /// No participant table is currently reachable.
    pub degraded: bool,
}

impl ScoreboardResponse {
    /// Snapshot the cache together with the current degraded flag.
    pub fn from_store(store: &ParticipantStore, degraded: bool) -> Self {
        Self {
            participants: store.participants().iter().map(Into::into).collect(),
            loading: store.is_loading(),
            error: store.error().map(str::to_owned),
            degraded,
        }
    }
}

/// Payload used to add a participant. Omitted rounds default to 0.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateParticipantRequest {
    /// Display name.
    pub name: String,
    /// College the participant represents.
    pub college: String,
    /// Score of round 1.
    #[serde(default)]
    pub round1: f64,
    /// Score of round 2.
    #[serde(default)]
    pub round2: f64,
    /// Score of round 3.
    #[serde(default)]
    pub round3: f64,
    /// Score of round 4.
    #[serde(default)]
    pub round4: f64,
    /// Score of round 5.
    #[serde(default)]
    pub round5: f64,
}

impl Validate for CreateParticipantRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_not_blank(&self.name) {
            errors.add("name", e);
        }
        if let Err(e) = validate_not_blank(&self.college) {
            errors.add("college", e);
        }
        let rounds = [
            ("round1", self.round1),
            ("round2", self.round2),
            ("round3", self.round3),
            ("round4", self.round4),
            ("round5", self.round5),
        ];
        for (field, score) in rounds {
            if let Err(e) = validate_round_score(score) {
                errors.add(field, e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<CreateParticipantRequest> for NewParticipantEntity {
    fn from(value: CreateParticipantRequest) -> Self {
        Self {
            name: value.name.trim().to_string(),
            college: value.college.trim().to_string(),
            round1: value.round1,
            round2: value.round2,
            round3: value.round3,
            round4: value.round4,
            round5: value.round5,
        }
    }
}

/// Partial update; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateParticipantRequest {
    /// Replacement display name; must not be blank.
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement college; must not be blank.
    #[serde(default)]
    pub college: Option<String>,
    /// Replacement score for round 1.
    #[serde(default)]
    pub round1: Option<f64>,
    /// Replacement score for round 2.
    #[serde(default)]
    pub round2: Option<f64>,
    /// Replacement score for round 3.
    #[serde(default)]
    pub round3: Option<f64>,
    /// Replacement score for round 4.
    #[serde(default)]
    pub round4: Option<f64>,
    /// Replacement score for round 5.
    #[serde(default)]
    pub round5: Option<f64>,
}

impl Validate for UpdateParticipantRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(Err(e)) = self.name.as_deref().map(validate_not_blank) {
            errors.add("name", e);
        }
        if let Some(Err(e)) = self.college.as_deref().map(validate_not_blank) {
            errors.add("college", e);
        }
        let rounds = [
            ("round1", self.round1),
            ("round2", self.round2),
            ("round3", self.round3),
            ("round4", self.round4),
            ("round5", self.round5),
        ];
        for (field, score) in rounds {
            if let Some(Err(e)) = score.map(validate_round_score) {
                errors.add(field, e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl UpdateParticipantRequest {
    /// Build the remote patch, stamping `updated_at` with `now`.
    pub fn into_patch(self, now: SystemTime) -> ParticipantPatchEntity {
        ParticipantPatchEntity {
            name: self.name.map(|name| name.trim().to_string()),
            college: self.college.map(|college| college.trim().to_string()),
            round1: self.round1,
            round2: self.round2,
            round3: self.round3,
            round4: self.round4,
            round5: self.round5,
            updated_at: now,
        }
    }
}

/// Acknowledges that a write was accepted by the remote table.
///
/// The change becomes visible once the push feed or a reload delivers it.
#[derive(Debug, Serialize, ToSchema)]
pub struct WriteAccepted {
    /// Participant the write targets.
    pub id: String,
    /// Human-readable acknowledgement.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, college: &str) -> CreateParticipantRequest {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "college": college,
            "round1": 5.0,
        }))
        .unwrap()
    }

    #[test]
    fn omitted_rounds_default_to_zero() {
        let req = request("X", "Y");
        assert!(req.validate().is_ok());

        let entity = NewParticipantEntity::from(req);
        assert_eq!(entity.round1, 5.0);
        assert_eq!(entity.round5, 0.0);
    }

    #[test]
    fn blank_name_or_college_is_rejected() {
        let errors = request(" ", "").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("college"));
    }

    #[test]
    fn update_validates_only_supplied_fields() {
        let ok = UpdateParticipantRequest {
            round2: Some(4.5),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad = UpdateParticipantRequest {
            name: Some(String::new()),
            round3: Some(-2.0),
            ..Default::default()
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("round3"));
    }

    #[test]
    fn patch_carries_the_write_time() {
        let now = SystemTime::now();
        let patch = UpdateParticipantRequest {
            college: Some(" East ".into()),
            ..Default::default()
        }
        .into_patch(now);

        assert_eq!(patch.college.as_deref(), Some("East"));
        assert_eq!(patch.name, None);
        assert_eq!(patch.updated_at, now);
    }
}
