use serde::Serialize;
use tracing::{info, warn};

use crate::dto::draft_dto::{MatchDraft, Side};
use crate::error::StoreError;
use crate::store::DraftStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum InitOutcome {
    Created,
    AlreadyExists,
    SameTeamNames,
}

/// Creates the match document on first touch. Both clients may call this at
/// once: the store's insert-if-absent keeps whichever document landed first.
pub async fn initialize<S: DraftStore>(
    store: &S,
    match_id: &str,
    mode: &str,
    team_name: &str,
    opposite_team: &str,
    initial_side: Side,
) -> Result<InitOutcome, StoreError> {
    if team_name == opposite_team {
        warn!(match_id, team_name, "Both teams have the same name, not creating draft.");
        return Ok(InitOutcome::SameTeamNames);
    }

    if store.get(match_id).await?.is_some() {
        return Ok(InitOutcome::AlreadyExists);
    }

    let draft = MatchDraft::new(mode, team_name, opposite_team, initial_side);
    if store.create(match_id, draft).await? {
        info!(match_id, mode, team_name, opposite_team, %initial_side, "Created draft.");
        Ok(InitOutcome::Created)
    } else {
        Ok(InitOutcome::AlreadyExists)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dto::draft_dto::{SideTeams, Slots};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn fresh_match_gets_first_set() {
        let store = MemoryStore::default();
        let outcome = initialize(&store, "M1", "blind", "TeamA", "TeamB", Side::Blue).await.unwrap();
        assert_eq!(outcome, InitOutcome::Created);

        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(draft.current_set, 1);
        assert_eq!(draft.mode, "blind");
        let set = draft.active_set().unwrap();
        assert_eq!(set.teams, SideTeams { blue: "TeamA".into(), red: "TeamB".into() });
        assert_eq!(set.ban["TeamA"], Slots::default());
        assert!(draft.total["TeamA"].is_empty());
        assert!(draft.total["TeamB"].is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn both_clients_initializing_keep_one_document() {
        let store = Arc::new(MemoryStore::default());
        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                initialize(&*store, "M1", "blind", "TeamA", "TeamB", Side::Blue).await.unwrap()
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                initialize(&*store, "M1", "blind", "TeamB", "TeamA", Side::Red).await.unwrap()
            })
        };
        let outcomes = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| **o == InitOutcome::Created).count(), 1);
        assert_eq!(store.version("M1").await, Some(1));
        let draft = store.get("M1").await.unwrap().unwrap();
        assert_eq!(draft.active_set().unwrap().teams.blue, "TeamA");
    }

    #[tokio::test]
    async fn identical_team_names_are_refused() {
        let store = MemoryStore::default();
        let outcome = initialize(&store, "M1", "blind", "TeamA", "TeamA", Side::Blue).await.unwrap();
        assert_eq!(outcome, InitOutcome::SameTeamNames);
        assert!(store.get("M1").await.unwrap().is_none());
    }
}
