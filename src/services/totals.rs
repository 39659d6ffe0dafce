use serde::Serialize;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{DraftStore, TxDecision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TotalOutcome {
    Appended { added: usize },
    AlreadyCommitted,
    NothingPicked,
    MissingDraft,
}

/// Appends the active set's picks for `team_name` to the cross-set total.
///
/// If every pick is already somewhere in the total this is a no-op, so a
/// second call after the set ends adds nothing. That check is coarse: a
/// champion picked again in a later set counts as already recorded.
pub async fn commit_total_if_needed<S: DraftStore>(
    store: &S,
    match_id: &str,
    team_name: &str,
) -> Result<TotalOutcome, StoreError> {
    let outcome = store
        .transaction(match_id, |snapshot, _| {
            let Some(draft) = snapshot else {
                return TxDecision::Abort(TotalOutcome::MissingDraft);
            };
            let Some(picks) = draft.active_set().and_then(|set| set.pick.get(team_name)) else {
                return TxDecision::Abort(TotalOutcome::MissingDraft);
            };
            let picks: Vec<&String> = picks.iter().filter(|name| !name.is_empty()).collect();
            if picks.is_empty() {
                return TxDecision::Abort(TotalOutcome::NothingPicked);
            }

            let existing = draft.total.get(team_name).map(Vec::as_slice).unwrap_or_default();
            if picks.iter().all(|name| existing.contains(*name)) {
                return TxDecision::Abort(TotalOutcome::AlreadyCommitted);
            }

            let added = picks.len();
            let mut next = draft.clone();
            next.total
                .entry(team_name.to_string())
                .or_default()
                .extend(picks.into_iter().cloned());
            TxDecision::Commit(next, TotalOutcome::Appended { added })
        })
        .await?;

    match &outcome {
        TotalOutcome::Appended { added } => info!(match_id, team_name, added, "Committed picks to total."),
        other => debug!(match_id, team_name, ?other, "Total left unchanged."),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::draft_dto::{MatchDraft, Side};
    use crate::store::MemoryStore;

    async fn with_picks(picks: [&str; 5]) -> MemoryStore {
        let store = MemoryStore::default();
        let mut draft = MatchDraft::new("blind", "TeamA", "TeamB", Side::Blue);
        if let Some(set) = draft.active_set_mut() {
            set.pick.insert("TeamA".to_string(), picks.map(String::from));
        }
        store.create("M1", draft).await.unwrap();
        store
    }

    #[tokio::test]
    async fn second_commit_leaves_total_unchanged() {
        let store = with_picks(["Ahri", "Zed", "Lux", "Jinx", "Thresh"]).await;

        let first = commit_total_if_needed(&store, "M1", "TeamA").await.unwrap();
        assert_eq!(first, TotalOutcome::Appended { added: 5 });
        let after_first = store.get("M1").await.unwrap().unwrap().total["TeamA"].clone();

        let second = commit_total_if_needed(&store, "M1", "TeamA").await.unwrap();
        assert_eq!(second, TotalOutcome::AlreadyCommitted);
        let after_second = store.get("M1").await.unwrap().unwrap().total["TeamA"].clone();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second, vec!["Ahri", "Zed", "Lux", "Jinx", "Thresh"]);
    }

    #[tokio::test]
    async fn empty_slots_are_never_recorded() {
        let store = with_picks(["", "", "", "", ""]).await;
        let outcome = commit_total_if_needed(&store, "M1", "TeamA").await.unwrap();
        assert_eq!(outcome, TotalOutcome::NothingPicked);
        assert!(store.get("M1").await.unwrap().unwrap().total["TeamA"].is_empty());
    }

    #[tokio::test]
    async fn unknown_team_or_match_is_missing() {
        let store = with_picks(["Ahri", "", "", "", ""]).await;
        assert_eq!(commit_total_if_needed(&store, "M1", "TeamZ").await.unwrap(), TotalOutcome::MissingDraft);
        assert_eq!(commit_total_if_needed(&store, "M2", "TeamA").await.unwrap(), TotalOutcome::MissingDraft);
    }
}
