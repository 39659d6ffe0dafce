use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dto::draft_dto::{MatchDraft, Readiness, Side};
use crate::error::StoreError;
use crate::store::{DraftStore, TxDecision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ReadyOutcome {
    #[serde(rename_all = "camelCase")]
    Marked { side: Side, both_ready: bool },
    UnknownTeam,
    MissingDraft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StartOutcome {
    #[serde(rename_all = "camelCase")]
    Started { started_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    AlreadyStarted { started_at: DateTime<Utc> },
    NotReady,
    MissingDraft,
}

/// Which side `team_name` plays in the active set.
///
/// `None` unless the team plays in the active set. Set 1 then trusts the
/// side the caller joined with. Later sets, or a caller that did not say,
/// go by the persisted `teams` map.
pub fn resolve_side(draft: &MatchDraft, team_name: &str, initial_side: Option<Side>) -> Option<Side> {
    let set = draft.active_set()?;
    let listed = set.teams.side_of(team_name);
    if listed.is_none() && !set.ban.contains_key(team_name) {
        return None;
    }
    if draft.current_set == 1 {
        if let Some(side) = initial_side {
            return Some(side);
        }
    }
    listed
}

/// Flags `team_name`'s side as ready for the active set and reaffirms the
/// team on that side.
pub async fn mark_ready<S: DraftStore>(
    store: &S,
    match_id: &str,
    team_name: &str,
    initial_side: Option<Side>,
) -> Result<ReadyOutcome, StoreError> {
    let outcome = store
        .transaction(match_id, |snapshot, _| {
            let Some(draft) = snapshot else {
                return TxDecision::Abort(ReadyOutcome::MissingDraft);
            };
            if draft.active_set().is_none() {
                return TxDecision::Abort(ReadyOutcome::MissingDraft);
            }
            let Some(side) = resolve_side(draft, team_name, initial_side) else {
                return TxDecision::Abort(ReadyOutcome::UnknownTeam);
            };

            let mut next = draft.clone();
            let Some(set) = next.active_set_mut() else {
                return TxDecision::Abort(ReadyOutcome::MissingDraft);
            };
            set.started.set(side, Readiness::Ready);
            set.teams.set(side, team_name);
            let both_ready = set.started.both_ready();

            TxDecision::Commit(next, ReadyOutcome::Marked { side, both_ready })
        })
        .await?;

    match &outcome {
        ReadyOutcome::Marked { side, both_ready } => {
            info!(match_id, team_name, %side, both_ready, "Team is ready.")
        }
        ReadyOutcome::UnknownTeam => {
            warn!(match_id, team_name, "Team is not part of the active set, ignoring ready.")
        }
        ReadyOutcome::MissingDraft => debug!(match_id, "No draft to mark ready yet."),
    }
    Ok(outcome)
}

/// Stamps the set's start time once both sides are ready. Repeat calls keep
/// the first stamp.
pub async fn set_started_at_if_needed<S: DraftStore>(
    store: &S,
    match_id: &str,
) -> Result<StartOutcome, StoreError> {
    let outcome = store
        .transaction(match_id, |snapshot, now| {
            let Some(draft) = snapshot else {
                return TxDecision::Abort(StartOutcome::MissingDraft);
            };
            let Some(set) = draft.active_set() else {
                return TxDecision::Abort(StartOutcome::MissingDraft);
            };
            if let Some(started_at) = set.started_at {
                return TxDecision::Abort(StartOutcome::AlreadyStarted { started_at });
            }
            if !set.started.both_ready() {
                return TxDecision::Abort(StartOutcome::NotReady);
            }

            let mut next = draft.clone();
            if let Some(set) = next.active_set_mut() {
                set.started_at = Some(now);
            }
            TxDecision::Commit(next, StartOutcome::Started { started_at: now })
        })
        .await?;

    if let StartOutcome::Started { started_at } = &outcome {
        info!(match_id, %started_at, "Set started.");
    }
    Ok(outcome)
}

/// Sets `isNextSetPreparing` to `value`. Returns whether anything changed.
pub async fn toggle_preparing<S: DraftStore>(
    store: &S,
    match_id: &str,
    value: bool,
) -> Result<bool, StoreError> {
    let changed = store
        .transaction(match_id, |snapshot, _| match snapshot {
            Some(draft) if draft.is_next_set_preparing != value => {
                let mut next = draft.clone();
                next.is_next_set_preparing = value;
                TxDecision::Commit(next, true)
            }
            _ => TxDecision::Abort(false),
        })
        .await?;

    if changed {
        info!(match_id, value, "Next set preparing flag changed.");
    }
    Ok(changed)
}
