use serde::Serialize;
use tracing::{error, info};

use crate::dto::draft_dto::{SetDraft, Side, SideTeams};
use crate::error::StoreError;
use crate::services::phase_script::TERMINAL_STEP;
use crate::store::{DraftStore, TxDecision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NextSetOutcome {
    Created { set: u32 },
    /// The active set is still being drafted.
    #[serde(rename_all = "camelCase")]
    NotComplete { current_step: u8 },
    #[serde(rename_all = "camelCase")]
    SeriesOver { max_sets: u32 },
}

/// Opens set `currentSet + 1` with `team_name` on `winning_side`.
///
/// The whole set entry, the `currentSet` bump and the cleared preparing
/// flag land in one commit, or nothing does. A missing document is an error
/// here so the caller can log it.
pub async fn create_next_set<S: DraftStore>(
    store: &S,
    match_id: &str,
    winning_side: Side,
    team_name: &str,
    opposite_team: &str,
    max_sets: u32,
) -> Result<NextSetOutcome, StoreError> {
    let result = store
        .transaction(match_id, |snapshot, _| {
            let Some(draft) = snapshot else {
                return TxDecision::Abort(None);
            };
            let current_step = draft.active_set().map_or(TERMINAL_STEP, |set| set.current_step);
            if current_step < TERMINAL_STEP {
                return TxDecision::Abort(Some(NextSetOutcome::NotComplete { current_step }));
            }
            if draft.current_set >= max_sets {
                return TxDecision::Abort(Some(NextSetOutcome::SeriesOver { max_sets }));
            }

            let next_set = draft.current_set + 1;
            let mut next = draft.clone();
            next.sets.insert(
                next_set,
                SetDraft::fresh(SideTeams::assign(winning_side, team_name, opposite_team)),
            );
            next.current_set = next_set;
            next.is_next_set_preparing = false;

            TxDecision::Commit(next, Some(NextSetOutcome::Created { set: next_set }))
        })
        .await;

    match result {
        Ok(Some(outcome)) => {
            if let NextSetOutcome::Created { set } = &outcome {
                info!(match_id, set, %winning_side, team_name, "Created next set.");
            }
            Ok(outcome)
        }
        Ok(None) => {
            error!(match_id, "Cannot create next set, draft does not exist.");
            Err(StoreError::NotFound(match_id.to_string()))
        }
        Err(e) => {
            error!(match_id, "Next set transaction failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::draft_dto::{MatchDraft, Readiness, Slots};
    use crate::store::MemoryStore;

    async fn finished_first_set() -> MemoryStore {
        let store = MemoryStore::default();
        let mut draft = MatchDraft::new("blind", "TeamA", "TeamB", Side::Blue);
        draft.is_next_set_preparing = true;
        if let Some(set) = draft.active_set_mut() {
            set.current_step = TERMINAL_STEP;
        }
        store.create("M1", draft).await.unwrap();
        store
    }

    #[tokio::test]
    async fn completed_set_opens_a_fresh_one() {
        let store = finished_first_set().await;
        let outcome = create_next_set(&store, "M1", Side::Blue, "TeamA", "TeamB", 5).await.unwrap();
        assert_eq!(outcome, NextSetOutcome::Created { set: 2 });

        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(draft.current_set, 2);
        assert!(!draft.is_next_set_preparing);

        let set = &draft.sets[&2];
        assert_eq!(set.teams, SideTeams { blue: "TeamA".into(), red: "TeamB".into() });
        assert_eq!(set.current_step, 0);
        assert_eq!(set.started.blue_team, Readiness::Pending);
        assert_eq!(set.started.red_team, Readiness::Pending);
        assert_eq!(set.ban["TeamA"], Slots::default());
        assert_eq!(set.pick["TeamB"], Slots::default());
        assert_eq!(set.started_at, None);
    }

    #[tokio::test]
    async fn side_assignment_can_flip() {
        let store = finished_first_set().await;
        create_next_set(&store, "M1", Side::Red, "TeamA", "TeamB", 5).await.unwrap();
        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(draft.sets[&2].teams.red, "TeamA");
        assert_eq!(draft.sets[&2].teams.blue, "TeamB");
    }

    #[tokio::test]
    async fn second_caller_does_not_open_a_third_set() {
        let store = finished_first_set().await;
        create_next_set(&store, "M1", Side::Blue, "TeamA", "TeamB", 5).await.unwrap();
        let again = create_next_set(&store, "M1", Side::Red, "TeamB", "TeamA", 5).await.unwrap();

        assert_eq!(again, NextSetOutcome::NotComplete { current_step: 0 });
        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(draft.current_set, 2);
        assert!(!draft.sets.contains_key(&3));
    }

    #[tokio::test]
    async fn series_cap_and_missing_document() {
        let store = finished_first_set().await;
        let capped = create_next_set(&store, "M1", Side::Blue, "TeamA", "TeamB", 1).await.unwrap();
        assert_eq!(capped, NextSetOutcome::SeriesOver { max_sets: 1 });

        let err = create_next_set(&store, "nope", Side::Blue, "TeamA", "TeamB", 5).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
