use serde::Serialize;

use crate::dto::draft_dto::{ActionType, Side};

pub const PHASE_COUNT: usize = 22;
pub const SWAP_STEP: u8 = 20;
/// Reaching this step means the set's draft is over.
pub const TERMINAL_STEP: u8 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Phase {
    Ban { side: Side, slot: usize },
    Pick { side: Side, slot: usize },
    Swap,
    Complete,
}

/// Who is allowed to act during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Side(Side),
    Both,
    Nobody,
}

use Side::{Blue, Red};

pub static PHASE_SCRIPT: [Phase; PHASE_COUNT] = [
    Phase::Ban { side: Blue, slot: 0 },
    Phase::Ban { side: Red, slot: 0 },
    Phase::Ban { side: Blue, slot: 1 },
    Phase::Ban { side: Red, slot: 1 },
    Phase::Ban { side: Blue, slot: 2 },
    Phase::Ban { side: Red, slot: 2 },
    Phase::Pick { side: Blue, slot: 0 },
    Phase::Pick { side: Red, slot: 0 },
    Phase::Pick { side: Red, slot: 1 },
    Phase::Pick { side: Blue, slot: 1 },
    Phase::Pick { side: Blue, slot: 2 },
    Phase::Pick { side: Red, slot: 2 },
    Phase::Ban { side: Red, slot: 3 },
    Phase::Ban { side: Blue, slot: 3 },
    Phase::Ban { side: Red, slot: 4 },
    Phase::Ban { side: Blue, slot: 4 },
    Phase::Pick { side: Red, slot: 3 },
    Phase::Pick { side: Blue, slot: 3 },
    Phase::Pick { side: Blue, slot: 4 },
    Phase::Pick { side: Red, slot: 4 },
    Phase::Swap,
    Phase::Complete,
];

pub fn phase_at(step: u8) -> Option<Phase> {
    PHASE_SCRIPT.get(step as usize).copied()
}

impl Phase {
    pub fn actor(&self) -> Actor {
        match self {
            Phase::Ban { side, .. } | Phase::Pick { side, .. } => Actor::Side(*side),
            Phase::Swap => Actor::Both,
            Phase::Complete => Actor::Nobody,
        }
    }

    /// `None` for phases that take no champion.
    pub fn action(&self) -> Option<ActionType> {
        match self {
            Phase::Ban { .. } => Some(ActionType::Ban),
            Phase::Pick { .. } => Some(ActionType::Pick),
            Phase::Swap | Phase::Complete => None,
        }
    }

    pub fn slot(&self) -> Option<usize> {
        match self {
            Phase::Ban { slot, .. } | Phase::Pick { slot, .. } => Some(*slot),
            Phase::Swap | Phase::Complete => None,
        }
    }

    pub fn is_acted_by(&self, side: Side) -> bool {
        match self.actor() {
            Actor::Side(s) => s == side,
            Actor::Both => true,
            Actor::Nobody => false,
        }
    }
}
