use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dto::draft_dto::{ActionType, MatchDraft, SetDraft};
use crate::error::StoreError;
use crate::services::phase_script::{phase_at, Phase, TERMINAL_STEP};
use crate::store::{DraftStore, TxDecision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TurnOutcome {
    /// The turn committed and the set moved on to `step`.
    #[serde(rename_all = "camelCase")]
    Applied { set: u32, step: u8 },
    /// Someone already moved past `expected_step`. Reconcile from the feed.
    #[serde(rename_all = "camelCase")]
    Stale { live_step: u8 },
    MissingDraft,
    Rejected { reason: TurnRejection },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnRejection {
    EmptyChampion,
    DraftComplete,
    PhaseMismatch,
    UnknownTeam,
    NotYourTurn,
    /// Both sides have not readied up for the active set.
    NotStarted,
    /// Already banned or picked this set, or in fearless modes in an earlier one.
    AlreadyUsed,
}

/// Checks the caller's believed step against the live one.
/// `Err` carries the outcome to return without writing.
fn guard_step(draft: Option<&MatchDraft>, expected_step: u8) -> Result<(&MatchDraft, &SetDraft), TurnOutcome> {
    let draft = draft.ok_or(TurnOutcome::MissingDraft)?;
    let set = draft.active_set().ok_or(TurnOutcome::MissingDraft)?;
    if set.current_step != expected_step {
        return Err(TurnOutcome::Stale { live_step: set.current_step });
    }
    if expected_step >= TERMINAL_STEP {
        return Err(TurnOutcome::Rejected { reason: TurnRejection::DraftComplete });
    }
    if !set.started.both_ready() {
        return Err(TurnOutcome::Rejected { reason: TurnRejection::NotStarted });
    }
    Ok((draft, set))
}

fn validate_selection(
    draft: &MatchDraft,
    set: &SetDraft,
    team_name: &str,
    champion: &str,
    action: ActionType,
    expected_step: u8,
) -> Result<usize, TurnRejection> {
    let phase = phase_at(expected_step).ok_or(TurnRejection::DraftComplete)?;
    if phase.action() != Some(action) {
        return Err(TurnRejection::PhaseMismatch);
    }
    let side = set.teams.side_of(team_name).ok_or(TurnRejection::UnknownTeam)?;
    if !set.slots(action).contains_key(team_name) {
        return Err(TurnRejection::UnknownTeam);
    }
    if !phase.is_acted_by(side) {
        return Err(TurnRejection::NotYourTurn);
    }
    if set.selections().any(|used| used == champion) {
        return Err(TurnRejection::AlreadyUsed);
    }
    if draft.is_fearless() && draft.total.values().flatten().any(|used| used == champion) {
        return Err(TurnRejection::AlreadyUsed);
    }
    phase.slot().ok_or(TurnRejection::PhaseMismatch)
}

/// Writes `champion` into the slot owned by `expected_step` and advances the set.
///
/// Of any number of concurrent calls carrying the same `expected_step`,
/// exactly one commits. The rest see the moved step and return `Stale`.
pub async fn apply_turn<S: DraftStore>(
    store: &S,
    match_id: &str,
    team_name: &str,
    champion: &str,
    action: ActionType,
    expected_step: u8,
) -> Result<TurnOutcome, StoreError> {
    let champion = champion.trim();
    if champion.is_empty() {
        return Ok(TurnOutcome::Rejected { reason: TurnRejection::EmptyChampion });
    }

    let outcome = store
        .transaction(match_id, |snapshot, now| {
            let (draft, set) = match guard_step(snapshot, expected_step) {
                Ok(found) => found,
                Err(outcome) => return TxDecision::Abort(outcome),
            };
            let set_number = draft.current_set;
            let slot = match validate_selection(draft, set, team_name, champion, action, expected_step) {
                Ok(slot) => slot,
                Err(reason) => return TxDecision::Abort(TurnOutcome::Rejected { reason }),
            };

            let Some(mut next) = snapshot.cloned() else {
                return TxDecision::Abort(TurnOutcome::MissingDraft);
            };
            let Some(set) = next.active_set_mut() else {
                return TxDecision::Abort(TurnOutcome::MissingDraft);
            };
            if let Some(slots) = set.slots_mut(action).get_mut(team_name) {
                slots[slot] = champion.to_string();
            }
            set.current_step = expected_step + 1;
            set.started_at = Some(now);

            TxDecision::Commit(next, TurnOutcome::Applied { set: set_number, step: expected_step + 1 })
        })
        .await?;

    log_outcome(match_id, team_name, &outcome);
    Ok(outcome)
}

/// Moves past a phase without a selection (swap phase, skipped turns).
pub async fn advance_step_only<S: DraftStore>(
    store: &S,
    match_id: &str,
    expected_step: u8,
) -> Result<TurnOutcome, StoreError> {
    let outcome = store
        .transaction(match_id, |snapshot, now| {
            let set_number = match guard_step(snapshot, expected_step) {
                Ok((draft, _)) => draft.current_set,
                Err(outcome) => return TxDecision::Abort(outcome),
            };

            let Some(mut next) = snapshot.cloned() else {
                return TxDecision::Abort(TurnOutcome::MissingDraft);
            };
            let Some(set) = next.active_set_mut() else {
                return TxDecision::Abort(TurnOutcome::MissingDraft);
            };
            set.current_step = expected_step + 1;
            set.started_at = Some(now);

            TxDecision::Commit(next, TurnOutcome::Applied { set: set_number, step: expected_step + 1 })
        })
        .await?;

    log_outcome(match_id, "-", &outcome);
    Ok(outcome)
}

/// The phase a client should be acting on for its current view.
pub fn current_phase(draft: &MatchDraft) -> Option<Phase> {
    draft.active_set().and_then(|set| phase_at(set.current_step))
}

fn log_outcome(match_id: &str, team_name: &str, outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Applied { set, step } => info!(match_id, team_name, set, step, "Turn committed."),
        TurnOutcome::Stale { live_step } => debug!(match_id, team_name, live_step, "Stale turn ignored."),
        TurnOutcome::MissingDraft => debug!(match_id, "No draft to apply a turn to yet."),
        TurnOutcome::Rejected { reason } => warn!(match_id, team_name, ?reason, "Turn rejected."),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dto::draft_dto::{Readiness, Side};
    use crate::services::phase_script::SWAP_STEP;
    use crate::store::{MemoryStore, RetryPolicy};

    fn ready_draft(mode: &str) -> MatchDraft {
        let mut draft = MatchDraft::new(mode, "TeamA", "TeamB", Side::Blue);
        let set = draft.active_set_mut().unwrap();
        set.started.set(Side::Blue, Readiness::Ready);
        set.started.set(Side::Red, Readiness::Ready);
        draft
    }

    async fn seeded_with(draft: MatchDraft) -> MemoryStore {
        let store = MemoryStore::new(RetryPolicy::with_attempts(20));
        store.create("M1", draft).await.unwrap();
        store
    }

    async fn seeded() -> MemoryStore {
        seeded_with(ready_draft("blind")).await
    }

    fn step_of(draft: &MatchDraft) -> u8 {
        draft.active_set().unwrap().current_step
    }

    #[tokio::test]
    async fn first_ban_lands_in_blue_slot_zero() {
        let store = seeded().await;
        let outcome = apply_turn(&store, "M1", "TeamA", "Ahri", ActionType::Ban, 0).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Applied { set: 1, step: 1 });

        let draft = store.get("M1").await.unwrap().unwrap();
        let set = draft.active_set().unwrap();
        assert_eq!(set.ban["TeamA"][0], "Ahri");
        assert_eq!(set.current_step, 1);
        assert!(set.started_at.is_some());
    }

    #[tokio::test]
    async fn replayed_step_is_stale_and_keeps_first_champion() {
        let store = seeded().await;
        apply_turn(&store, "M1", "TeamA", "Ahri", ActionType::Ban, 0).await.unwrap();
        let second = apply_turn(&store, "M1", "TeamA", "Zed", ActionType::Ban, 0).await.unwrap();

        assert_eq!(second, TurnOutcome::Stale { live_step: 1 });
        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(draft.active_set().unwrap().ban["TeamA"][0], "Ahri");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_turns_commit_exactly_once() {
        for _ in 0..20 {
            let store = Arc::new(seeded().await);
            let a = {
                let store = store.clone();
                tokio::spawn(async move {
                    apply_turn(&*store, "M1", "TeamA", "Ahri", ActionType::Ban, 0).await.unwrap()
                })
            };
            let b = {
                let store = store.clone();
                tokio::spawn(async move {
                    apply_turn(&*store, "M1", "TeamA", "Zed", ActionType::Ban, 0).await.unwrap()
                })
            };
            let outcomes = [a.await.unwrap(), b.await.unwrap()];

            let applied = outcomes.iter().filter(|o| matches!(o, TurnOutcome::Applied { .. })).count();
            assert_eq!(applied, 1, "{outcomes:?}");
            assert!(outcomes.contains(&TurnOutcome::Stale { live_step: 1 }));

            let draft = store.get("M1").await.unwrap().unwrap();
            let set = draft.active_set().unwrap();
            assert_eq!(set.current_step, 1);
            assert!(["Ahri", "Zed"].contains(&set.ban["TeamA"][0].as_str()));
            assert_eq!(set.ban["TeamA"][1], "");
        }
    }

    #[tokio::test]
    async fn wrong_side_or_action_is_rejected_without_mutation() {
        let store = seeded().await;
        let red = apply_turn(&store, "M1", "TeamB", "Ahri", ActionType::Ban, 0).await.unwrap();
        assert_eq!(red, TurnOutcome::Rejected { reason: TurnRejection::NotYourTurn });

        let pick = apply_turn(&store, "M1", "TeamA", "Ahri", ActionType::Pick, 0).await.unwrap();
        assert_eq!(pick, TurnOutcome::Rejected { reason: TurnRejection::PhaseMismatch });

        let stranger = apply_turn(&store, "M1", "TeamC", "Ahri", ActionType::Ban, 0).await.unwrap();
        assert_eq!(stranger, TurnOutcome::Rejected { reason: TurnRejection::UnknownTeam });

        let empty = apply_turn(&store, "M1", "TeamA", "  ", ActionType::Ban, 0).await.unwrap();
        assert_eq!(empty, TurnOutcome::Rejected { reason: TurnRejection::EmptyChampion });

        assert_eq!(step_of(&store.get("M1").await.unwrap().unwrap()), 0);
    }

    #[tokio::test]
    async fn turns_wait_for_both_sides_to_ready() {
        let store = seeded_with(MatchDraft::new("blind", "TeamA", "TeamB", Side::Blue)).await;
        store
            .update("M1", |draft, _| {
                draft.active_set_mut().unwrap().started.set(Side::Blue, Readiness::Ready)
            })
            .await
            .unwrap();

        let turn = apply_turn(&store, "M1", "TeamA", "Ahri", ActionType::Ban, 0).await.unwrap();
        assert_eq!(turn, TurnOutcome::Rejected { reason: TurnRejection::NotStarted });
        let pass = advance_step_only(&store, "M1", 0).await.unwrap();
        assert_eq!(pass, TurnOutcome::Rejected { reason: TurnRejection::NotStarted });

        let draft = store.get("M1").await.unwrap().unwrap();
        let set = draft.active_set().unwrap();
        assert_eq!(set.current_step, 0);
        assert_eq!(set.started_at, None);
        assert_eq!(set.ban["TeamA"][0], "");
    }

    #[tokio::test]
    async fn champion_used_this_set_is_rejected() {
        let store = seeded().await;
        apply_turn(&store, "M1", "TeamA", "Ahri", ActionType::Ban, 0).await.unwrap();

        let again = apply_turn(&store, "M1", "TeamB", "Ahri", ActionType::Ban, 1).await.unwrap();
        assert_eq!(again, TurnOutcome::Rejected { reason: TurnRejection::AlreadyUsed });

        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(step_of(&draft), 1);
        assert_eq!(draft.active_set().unwrap().ban["TeamB"][0], "");
    }

    #[tokio::test]
    async fn fearless_rejects_champions_from_earlier_sets() {
        let mut fearless = ready_draft("fearless");
        fearless.total.insert("TeamB".into(), vec!["Lux".into()]);
        let store = seeded_with(fearless).await;
        let outcome = apply_turn(&store, "M1", "TeamA", "Lux", ActionType::Ban, 0).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Rejected { reason: TurnRejection::AlreadyUsed });

        let mut normal = ready_draft("blind");
        normal.total.insert("TeamB".into(), vec!["Lux".into()]);
        let store = seeded_with(normal).await;
        let outcome = apply_turn(&store, "M1", "TeamA", "Lux", ActionType::Ban, 0).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Applied { set: 1, step: 1 });
    }

    #[tokio::test]
    async fn champion_name_is_stored_trimmed() {
        let store = seeded().await;
        apply_turn(&store, "M1", "TeamA", "  Ahri ", ActionType::Ban, 0).await.unwrap();
        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(draft.active_set().unwrap().ban["TeamA"][0], "Ahri");
    }

    #[tokio::test]
    async fn missing_document_is_reported_not_raised() {
        let store = MemoryStore::default();
        let outcome = apply_turn(&store, "ghost", "TeamA", "Ahri", ActionType::Ban, 0).await.unwrap();
        assert_eq!(outcome, TurnOutcome::MissingDraft);
        assert_eq!(advance_step_only(&store, "ghost", 0).await.unwrap(), TurnOutcome::MissingDraft);
    }

    #[tokio::test]
    async fn step_never_passes_terminal() {
        let store = seeded().await;
        let mut last = 0;
        for step in 0..30u8 {
            let _ = advance_step_only(&store, "M1", step).await.unwrap();
            let now = step_of(&store.get("M1").await.unwrap().unwrap());
            assert!(now >= last);
            assert!(now <= TERMINAL_STEP);
            last = now;
        }
        assert_eq!(last, TERMINAL_STEP);
        assert_eq!(
            advance_step_only(&store, "M1", TERMINAL_STEP).await.unwrap(),
            TurnOutcome::Rejected { reason: TurnRejection::DraftComplete }
        );
    }

    #[tokio::test]
    async fn swap_phase_advances_without_selection() {
        let store = seeded().await;
        store
            .update("M1", |draft, _| draft.active_set_mut().unwrap().current_step = SWAP_STEP)
            .await
            .unwrap();

        let outcome = advance_step_only(&store, "M1", SWAP_STEP).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Applied { set: 1, step: TERMINAL_STEP });
        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(current_phase(&draft), Some(Phase::Complete));
    }
}
