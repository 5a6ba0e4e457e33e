use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::score::format_score,
    state::reveal::{RevealFrame, RevealFrameEntry, RevealPhase, RevealStage},
};

/// Wire name of the reveal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RevealPhaseKind {
    /// Nothing is being revealed.
    Idle,
    /// Entries are being revealed one by one.
    Playing,
    /// Every entry is shown and the winner is highlighted.
    AllShown,
}

/// Wire name of the stage within one reveal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RevealStageKind {
    /// The current entry is held in the spotlight.
    Spotlight,
    /// Short pause before the next entry.
    Settling,
}

impl From<RevealStage> for RevealStageKind {
    fn from(value: RevealStage) -> Self {
        match value {
            RevealStage::Spotlight => RevealStageKind::Spotlight,
            RevealStage::Settling => RevealStageKind::Settling,
        }
    }
}

/// One slot of the reveal, lowest scorer first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealEntryView {
    /// 0-based reveal position; the last position is the top scorer.
    pub position: usize,
    /// Participant identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// College the participant represents.
    pub college: String,
    /// Total captured when the reveal started.
    pub total_score: f64,
    /// `total_score` formatted for display.
    pub total_score_display: String,
    /// The entry has been revealed.
    pub visible: bool,
    /// The entry is being revealed right now.
    pub spotlight: bool,
    /// Top scorer, set once every entry is shown.
    pub winner: bool,
}

/// Current reveal state, also broadcast as `reveal.updated`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealView {
    /// Where the playback is.
    pub phase: RevealPhaseKind,
    /// Position being revealed while playing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    /// Stage of the current step while playing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<RevealStageKind>,
    /// Snapshot entries, lowest scorer first; empty when idle.
    pub entries: Vec<RevealEntryView>,
}

impl From<&RevealFrame> for RevealView {
    fn from(frame: &RevealFrame) -> Self {
        let (phase, step, stage) = match frame.phase {
            RevealPhase::Idle => (RevealPhaseKind::Idle, None, None),
            RevealPhase::Playing { step, stage } => {
                (RevealPhaseKind::Playing, Some(step), Some(stage.into()))
            }
            RevealPhase::AllShown => (RevealPhaseKind::AllShown, None, None),
        };

        Self {
            phase,
            step,
            stage,
            entries: frame
                .entries
                .iter()
                .enumerate()
                .map(|(position, entry)| entry_view(position, entry))
                .collect(),
        }
    }
}

fn entry_view(position: usize, value: &RevealFrameEntry) -> RevealEntryView {
    RevealEntryView {
        position,
        id: value.entry.id.clone(),
        name: value.entry.name.clone(),
        college: value.entry.college.clone(),
        total_score: value.entry.total_score,
        total_score_display: format_score(value.entry.total_score),
        visible: value.visible,
        spotlight: value.spotlight,
        winner: value.winner,
    }
}

/// Acknowledges a reveal command.
#[derive(Debug, Serialize, ToSchema)]
pub struct RevealStartResponse {
    /// `false` when there was nobody to reveal.
    pub started: bool,
    /// Reveal state right after the command.
    pub reveal: RevealView,
}
