//! Locally cached, always-ranked view of the participant table.

use std::{cmp::Ordering, time::SystemTime};

use crate::dao::models::{ChangeEvent, ParticipantEntity, ROUND_COUNT};

/// Participant as seen by readers: a remote record plus its derived rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Identifier assigned by the remote table.
    pub id: String,
    /// 1-based position by descending total score.
    pub rank: usize,
    /// Display name.
    pub name: String,
    /// College the participant represents.
    pub college: String,
    /// Round scores, round 1 first.
    pub rounds: [f64; ROUND_COUNT],
    /// Sum of `rounds`, recomputed locally on every change.
    pub total_score: f64,
    /// Creation time reported by the remote table.
    pub created_at: SystemTime,
    /// Time of the last successful update write.
    pub updated_at: SystemTime,
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        let rounds = value.rounds();
        Self {
            id: value.id,
            rank: 0,
            name: value.name,
            college: value.college,
            rounds,
            total_score: rounds.iter().sum(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Recompute totals, stable-sort by total descending and assign ranks 1..N.
///
/// Ties keep the order they already had in `participants`.
pub fn rank_participants(participants: &mut [Participant]) {
    for participant in participants.iter_mut() {
        participant.total_score = participant.rounds.iter().sum();
    }
    participants.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
    });
    for (index, participant) in participants.iter_mut().enumerate() {
        participant.rank = index + 1;
    }
}

/// Owner of the ranked participant list, the loading flag and the latest error.
#[derive(Debug, Default)]
pub struct ParticipantStore {
    participants: Vec<Participant>,
    loading: bool,
    error: Option<String>,
}

impl ParticipantStore {
    /// Empty, not loading, no error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a full read as in flight.
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Replace the cache with a freshly read set and clear the error.
    pub fn finish_load(&mut self, records: Vec<ParticipantEntity>) {
        let mut participants: Vec<Participant> = records.into_iter().map(Into::into).collect();
        rank_participants(&mut participants);
        self.participants = participants;
        self.loading = false;
        self.error = None;
    }

    /// Keep the previous cache and remember why the read failed.
    pub fn fail_load(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    /// Remember the latest failure; earlier messages are dropped.
    pub fn record_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Apply one push-feed event and re-rank the whole list.
    pub fn apply(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => {
                let incoming = Participant::from(record);
                match self.participants.iter_mut().find(|p| p.id == incoming.id) {
                    Some(existing) => *existing = incoming,
                    None => self.participants.push(incoming),
                }
            }
            ChangeEvent::Deleted { id } => self.participants.retain(|p| p.id != id),
        }
        rank_participants(&mut self.participants);
    }

    /// Participants in rank order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// The `count` best ranked participants, best first.
    pub fn top(&self, count: usize) -> Vec<Participant> {
        self.participants.iter().take(count).cloned().collect()
    }

    /// A full read is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Most recent failure, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
