use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::dto::draft_dto::{ActionType, MatchDraft, SetDraft};
use crate::error::StoreError;
use crate::services::champion_catalog::ChampionCatalogClient;
use crate::services::phase_script::{phase_at, Phase, TERMINAL_STEP};
use crate::services::turn_coordinator::{advance_step_only, apply_turn, TurnOutcome, TurnRejection};
use crate::store::DraftStore;

/// When the turn at the set's current step runs out. `None` until the set has started.
pub fn turn_deadline(set: &SetDraft, turn_time: Duration) -> Option<DateTime<Utc>> {
    let started_at = set.started_at?;
    Some(started_at + chrono::Duration::from_std(turn_time).ok()?)
}

/// Catalog names nobody has used in the active set. Fearless modes also
/// exclude everything either team picked in earlier sets.
pub fn available_champions(draft: &MatchDraft, catalog: &[String]) -> Vec<String> {
    let mut taken: HashSet<&str> = draft
        .active_set()
        .map(|set| set.selections().collect())
        .unwrap_or_default();
    if draft.is_fearless() {
        taken.extend(draft.total.values().flatten().map(String::as_str));
    }
    catalog
        .iter()
        .filter(|name| !taken.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Resolves a lapsed turn at `expected_step` through the same staleness
/// guard as a normal turn. Picks get a random free champion, bans and the
/// swap are skipped.
pub async fn expire_turn<S: DraftStore>(
    store: &S,
    match_id: &str,
    expected_step: u8,
    catalog: &[String],
) -> Result<TurnOutcome, StoreError> {
    let Some(draft) = store.get(match_id).await? else {
        return Ok(TurnOutcome::MissingDraft);
    };
    let Some(set) = draft.active_set() else {
        return Ok(TurnOutcome::MissingDraft);
    };
    if set.current_step != expected_step {
        return Ok(TurnOutcome::Stale { live_step: set.current_step });
    }

    match phase_at(expected_step) {
        Some(Phase::Pick { side, .. }) => {
            let choice = available_champions(&draft, catalog).choose(&mut rand::rng()).cloned();
            match choice {
                Some(champion) => {
                    info!(match_id, expected_step, %champion, "Turn timed out, picking at random.");
                    let team_name = set.teams.get(side).to_string();
                    match apply_turn(store, match_id, &team_name, &champion, ActionType::Pick, expected_step)
                        .await?
                    {
                        TurnOutcome::Rejected { reason } => {
                            warn!(match_id, expected_step, ?reason, "Auto-pick rejected, skipping.");
                            advance_step_only(store, match_id, expected_step).await
                        }
                        outcome => Ok(outcome),
                    }
                }
                None => {
                    warn!(match_id, expected_step, "Turn timed out with no champion left, skipping.");
                    advance_step_only(store, match_id, expected_step).await
                }
            }
        }
        Some(Phase::Ban { .. } | Phase::Swap) => {
            info!(match_id, expected_step, "Turn timed out, passing.");
            advance_step_only(store, match_id, expected_step).await
        }
        Some(Phase::Complete) | None => {
            Ok(TurnOutcome::Rejected { reason: TurnRejection::DraftComplete })
        }
    }
}

/// How long a watcher waits on a match with no running turn before exiting.
const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Keeps at most one deadline watcher per match.
pub struct TurnWatchers {
    running: Mutex<HashSet<String>>,
    idle_timeout: Duration,
}

impl Default for TurnWatchers {
    fn default() -> Self {
        Self::with_idle_timeout(IDLE_TIMEOUT)
    }
}

impl TurnWatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self { running: Mutex::new(HashSet::new()), idle_timeout }
    }

    pub async fn is_watching(&self, match_id: &str) -> bool {
        self.running.lock().await.contains(match_id)
    }

    /// Spawns the watcher for `match_id` unless one is already running.
    pub async fn ensure<S: DraftStore>(
        self: &Arc<Self>,
        store: Arc<S>,
        catalog: Arc<ChampionCatalogClient>,
        match_id: &str,
        turn_time: Duration,
        max_sets: u32,
    ) {
        if !self.running.lock().await.insert(match_id.to_string()) {
            return;
        }

        let watchers = Arc::clone(self);
        let match_id = match_id.to_string();
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            let result = watch(&*store, &catalog, &match_id, turn_time, max_sets, idle_timeout).await;
            if let Err(e) = result {
                error!(match_id = %match_id, "Turn watcher stopped: {}", e);
            }
            watchers.running.lock().await.remove(&match_id);
        });
    }
}

/// Sleeps until the current turn's deadline, re-arming on every commit,
/// until the last allowed set is complete or the match goes quiet.
async fn watch<S: DraftStore>(
    store: &S,
    catalog: &ChampionCatalogClient,
    match_id: &str,
    turn_time: Duration,
    max_sets: u32,
    idle_timeout: Duration,
) -> Result<(), StoreError> {
    let mut feed = store.subscribe(match_id);
    loop {
        let deadline = match store.get(match_id).await? {
            Some(draft) => {
                let Some(set) = draft.active_set() else {
                    return Ok(());
                };
                if set.current_step >= TERMINAL_STEP && draft.current_set >= max_sets {
                    info!(match_id, "Series complete, turn watcher exiting.");
                    return Ok(());
                }
                if set.current_step < TERMINAL_STEP {
                    turn_deadline(set, turn_time).map(|at| (at, set.current_step))
                } else {
                    None
                }
            }
            None => None,
        };

        let Some((at, step)) = deadline else {
            match tokio::time::timeout(idle_timeout, feed.next()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return Ok(()),
                Err(_) => {
                    info!(match_id, "No activity on match, turn watcher exiting.");
                    return Ok(());
                }
            }
        };

        let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let names = match catalog.fetch_champion_names().await {
                    Ok(names) => names,
                    Err(e) => {
                        warn!(match_id, "Champion catalog unavailable for auto-pick: {}", e);
                        Vec::new()
                    }
                };
                match expire_turn(store, match_id, step, &names).await {
                    Ok(TurnOutcome::Applied { .. } | TurnOutcome::Stale { .. }) => {}
                    Ok(other) => {
                        warn!(match_id, step, ?other, "Lapsed turn could not be resolved.");
                        tokio::time::sleep(turn_time).await;
                    }
                    Err(e) => {
                        error!(match_id, step, "Failed to expire turn: {}", e);
                        tokio::time::sleep(Duration::from_millis(250)).await;
                    }
                }
            }
            event = feed.next() => {
                if event.is_none() {
                    return Ok(());
                }
            }
        }
    }
}
