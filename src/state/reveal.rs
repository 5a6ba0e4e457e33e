//! Timed reveal of the top ranked participants, lowest first.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::sleep,
};
use tracing::debug;

use crate::state::participants::Participant;

/// Number of participants shown in a reveal unless configured otherwise.
pub const DEFAULT_REVEAL_SIZE: usize = 6;

/// Participant summary frozen at the start of a playback.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealEntry {
    /// Participant identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// College the participant represents.
    pub college: String,
    /// Total at snapshot time.
    pub total_score: f64,
}

impl From<&Participant> for RevealEntry {
    fn from(value: &Participant) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            college: value.college.clone(),
            total_score: value.total_score,
        }
    }
}

/// Take the `size` best of a ranked list and order them lowest first.
pub fn build_snapshot(ranked: &[Participant], size: usize) -> Vec<RevealEntry> {
    let mut snapshot: Vec<RevealEntry> = ranked.iter().take(size).map(Into::into).collect();
    snapshot.reverse();
    snapshot
}

/// Sub-phase of the entry currently being revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStage {
    /// Entry just appeared and is emphasised.
    Spotlight,
    /// Emphasis dropped, waiting before the next entry.
    Settling,
}

/// Position of a playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    /// No snapshot, nothing shown.
    Idle,
    /// Entry `step` (0 = lowest scorer) is being revealed.
    Playing {
        /// Index into the snapshot.
        step: usize,
        /// Sub-phase of that entry.
        stage: RevealStage,
    },
    /// Every entry is shown and the last one is flagged as winner.
    AllShown,
}

/// Delay to wait before the next [`RevealMachine::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealDelay {
    /// Spotlight duration.
    Hold,
    /// Pause between entries.
    Gap,
}

/// Per-entry flags derived from the current phase.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealFrameEntry {
    /// Participant in this slot.
    pub entry: RevealEntry,
    /// Revealed at or before the current step.
    pub visible: bool,
    /// Held in the spotlight right now.
    pub spotlight: bool,
    /// Highest entry once every entry is shown.
    pub winner: bool,
}

/// Everything a presentation layer needs to draw the reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealFrame {
    /// Playback position.
    pub phase: RevealPhase,
    /// Snapshot entries, lowest scorer first.
    pub entries: Vec<RevealFrameEntry>,
}

impl RevealFrame {
    fn idle() -> Self {
        Self {
            phase: RevealPhase::Idle,
            entries: Vec::new(),
        }
    }
}

/// Pure state machine; timing lives in [`RevealSequencer`].
///
/// Revealed entries stay visible until reset.
#[derive(Debug)]
pub struct RevealMachine {
    snapshot: Vec<RevealEntry>,
    phase: RevealPhase,
}

impl Default for RevealMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RevealMachine {
    /// Idle machine without a snapshot.
    pub fn new() -> Self {
        Self {
            snapshot: Vec::new(),
            phase: RevealPhase::Idle,
        }
    }

    /// Reset, then begin a playback of `snapshot`.
    ///
    /// Returns the delay before the first advance, or `None` when the snapshot
    /// is empty and the machine stays idle.
    pub fn start(&mut self, snapshot: Vec<RevealEntry>) -> Option<RevealDelay> {
        self.reset();
        if snapshot.is_empty() {
            return None;
        }
        self.snapshot = snapshot;
        self.phase = RevealPhase::Playing {
            step: 0,
            stage: RevealStage::Spotlight,
        };
        Some(RevealDelay::Hold)
    }

    /// Move to the next phase, returning the delay before the following one.
    pub fn advance(&mut self) -> Option<RevealDelay> {
        match self.phase {
            RevealPhase::Playing {
                step,
                stage: RevealStage::Spotlight,
            } => {
                self.phase = RevealPhase::Playing {
                    step,
                    stage: RevealStage::Settling,
                };
                Some(RevealDelay::Gap)
            }
            RevealPhase::Playing {
                step,
                stage: RevealStage::Settling,
            } => {
                if step + 1 < self.snapshot.len() {
                    self.phase = RevealPhase::Playing {
                        step: step + 1,
                        stage: RevealStage::Spotlight,
                    };
                    Some(RevealDelay::Hold)
                } else {
                    self.phase = RevealPhase::AllShown;
                    None
                }
            }
            RevealPhase::Idle | RevealPhase::AllShown => None,
        }
    }

    /// Drop the snapshot and return to idle.
    pub fn reset(&mut self) {
        self.snapshot.clear();
        self.phase = RevealPhase::Idle;
    }

    /// Current phase.
    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Per-entry flags for the current phase.
    pub fn view(&self) -> RevealFrame {
        let last = self.snapshot.len().saturating_sub(1);
        let entries = self
            .snapshot
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let (visible, spotlight, winner) = match self.phase {
                    RevealPhase::Idle => (false, false, false),
                    RevealPhase::Playing { step, stage } => (
                        index <= step,
                        index == step && stage == RevealStage::Spotlight,
                        false,
                    ),
                    RevealPhase::AllShown => (true, false, index == last),
                };
                RevealFrameEntry {
                    entry: entry.clone(),
                    visible,
                    spotlight,
                    winner,
                }
            })
            .collect();

        RevealFrame {
            phase: self.phase,
            entries,
        }
    }
}

/// Durations driving the reveal, expressed in whole time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTimings {
    /// Length of one time unit.
    pub unit: Duration,
    /// Units an entry stays in the spotlight.
    pub hold_units: u32,
    /// Units between one entry settling and the next appearing.
    pub gap_units: u32,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            hold_units: 3,
            gap_units: 1,
        }
    }
}

impl RevealTimings {
    /// Wall-clock length of `delay`.
    pub fn delay(&self, delay: RevealDelay) -> Duration {
        match delay {
            RevealDelay::Hold => self.unit.saturating_mul(self.hold_units),
            RevealDelay::Gap => self.unit.saturating_mul(self.gap_units),
        }
    }
}

struct SequencerSlot {
    machine: RevealMachine,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct SequencerInner {
    slot: Mutex<SequencerSlot>,
    timings: RevealTimings,
    frames: watch::Sender<RevealFrame>,
}

impl SequencerInner {
    fn publish(&self, machine: &RevealMachine) {
        self.frames.send_replace(machine.view());
    }
}

/// Drives a [`RevealMachine`] with a single timer task per playback.
///
/// Every published frame is observable through [`RevealSequencer::subscribe`].
pub struct RevealSequencer {
    inner: Arc<SequencerInner>,
}

impl RevealSequencer {
    /// Idle sequencer using `timings`.
    pub fn new(timings: RevealTimings) -> Self {
        let (frames, _rx) = watch::channel(RevealFrame::idle());
        Self {
            inner: Arc::new(SequencerInner {
                slot: Mutex::new(SequencerSlot {
                    machine: RevealMachine::new(),
                    generation: 0,
                    timer: None,
                }),
                timings,
                frames,
            }),
        }
    }

    /// Cancel any running playback and start a new one.
    ///
    /// An empty `snapshot` returns `false` and leaves the current playback untouched.
    pub async fn start(&self, snapshot: Vec<RevealEntry>) -> bool {
        if snapshot.is_empty() {
            return false;
        }

        let mut slot = self.inner.slot.lock().await;
        cancel(&mut slot);

        let Some(first_delay) = slot.machine.start(snapshot) else {
            return false;
        };
        self.inner.publish(&slot.machine);

        let generation = slot.generation;
        let inner = Arc::downgrade(&self.inner);
        let timings = self.inner.timings;
        slot.timer = Some(tokio::spawn(run_timer(inner, generation, timings, first_delay)));
        true
    }

    /// Cancel any pending timer and return to idle.
    pub async fn reset(&self) {
        let mut slot = self.inner.slot.lock().await;
        cancel(&mut slot);
        slot.machine.reset();
        self.inner.publish(&slot.machine);
    }

    /// Most recently published frame.
    pub fn current(&self) -> RevealFrame {
        self.inner.frames.borrow().clone()
    }

    /// Watch every frame published from now on.
    pub fn subscribe(&self) -> watch::Receiver<RevealFrame> {
        self.inner.frames.subscribe()
    }
}

impl Drop for RevealSequencer {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.inner.slot.try_lock() {
            cancel(&mut slot);
        }
    }
}

fn cancel(slot: &mut SequencerSlot) {
    slot.generation = slot.generation.wrapping_add(1);
    if let Some(timer) = slot.timer.take() {
        timer.abort();
    }
}

async fn run_timer(
    inner: Weak<SequencerInner>,
    generation: u64,
    timings: RevealTimings,
    first_delay: RevealDelay,
) {
    let mut delay = first_delay;
    loop {
        sleep(timings.delay(delay)).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut slot = inner.slot.lock().await;
        // A reset or restart happened while this timer was sleeping.
        if slot.generation != generation {
            return;
        }

        let next = slot.machine.advance();
        inner.publish(&slot.machine);
        debug!(phase = ?slot.machine.phase(), "reveal advanced");

        match next {
            Some(next) => delay = next,
            None => {
                slot.timer = None;
                return;
            }
        }
    }
}
