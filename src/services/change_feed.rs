use serde::Serialize;

use crate::dto::draft_dto::MatchDraft;
use crate::services::phase_script::TERMINAL_STEP;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reaction", rename_all = "camelCase")]
pub enum DraftReaction {
    BothReady { set: u32 },
    StepChanged { set: u32, from: u8, to: u8 },
    DraftComplete { set: u32 },
    SetAdvanced { from: u32, to: u32 },
    PreparingChanged { preparing: bool },
}

#[derive(Debug, Clone, Copy)]
struct Observed {
    version: i64,
    set: u32,
    step: u8,
    both_ready: bool,
    preparing: bool,
}

/// Turns a stream of full snapshots into the transitions a client reacts to.
///
/// Snapshots older than the last one seen are dropped, so replaying a
/// re-read after a lag never moves the view backwards.
#[derive(Debug, Default)]
pub struct ChangeFeedConsumer {
    last: Option<Observed>,
}

impl ChangeFeedConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_version(&self) -> Option<i64> {
        self.last.map(|seen| seen.version)
    }

    pub fn observe(&mut self, version: i64, draft: &MatchDraft) -> Vec<DraftReaction> {
        if self.last.is_some_and(|seen| version <= seen.version) {
            return Vec::new();
        }
        let Some(set) = draft.active_set() else {
            return Vec::new();
        };

        let now = Observed {
            version,
            set: draft.current_set,
            step: set.current_step,
            both_ready: set.started.both_ready(),
            preparing: draft.is_next_set_preparing,
        };

        // A new set starts from a clean slate.
        let baseline = match self.last {
            Some(prev) if prev.set == now.set => prev,
            Some(prev) => Observed { set: now.set, step: 0, both_ready: false, ..prev },
            None => Observed { set: now.set, step: 0, both_ready: false, preparing: false, version },
        };

        let mut reactions = Vec::new();
        if let Some(prev) = self.last {
            if prev.set != now.set {
                reactions.push(DraftReaction::SetAdvanced { from: prev.set, to: now.set });
            }
        }
        if now.both_ready && !baseline.both_ready {
            reactions.push(DraftReaction::BothReady { set: now.set });
        }
        if now.step != baseline.step {
            reactions.push(DraftReaction::StepChanged { set: now.set, from: baseline.step, to: now.step });
        }
        if now.step == TERMINAL_STEP && baseline.step != TERMINAL_STEP {
            reactions.push(DraftReaction::DraftComplete { set: now.set });
        }
        if now.preparing != baseline.preparing {
            reactions.push(DraftReaction::PreparingChanged { preparing: now.preparing });
        }

        self.last = Some(now);
        reactions
    }
}
