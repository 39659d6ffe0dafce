use std::sync::Arc;

use tracing::{debug, warn};

use crate::dto::draft_dto::{MatchDraft, Side};
use crate::error::StoreError;
use crate::services::change_feed::{ChangeFeedConsumer, DraftReaction};
use crate::services::initializer::{initialize, InitOutcome};
use crate::services::phase_script::{phase_at, Phase};
use crate::services::readiness::{
    mark_ready, resolve_side, set_started_at_if_needed, toggle_preparing, ReadyOutcome,
};
use crate::services::set_advancer::{create_next_set, NextSetOutcome};
use crate::services::totals::commit_total_if_needed;
use crate::services::turn_coordinator::{advance_step_only, apply_turn, TurnOutcome};
use crate::store::{DraftChange, DraftFeed, DraftStore, FeedEvent};

/// Who a client is, handed in out of band (e.g. query parameters).
#[derive(Debug, Clone)]
pub struct Identity {
    pub match_id: String,
    pub team_name: String,
    pub opposite_team: String,
    pub mode: String,
    pub initial_side: Side,
}

/// One client's view of a match, kept in sync from the change feed.
pub struct DraftSession<S: DraftStore> {
    store: Arc<S>,
    identity: Identity,
    feed: DraftFeed,
    consumer: ChangeFeedConsumer,
    view: Option<MatchDraft>,
    /// (set, step) of the last submission, cleared whenever the step moves.
    submitted: Option<(u32, u8)>,
}

impl<S: DraftStore> DraftSession<S> {
    /// Subscribes, creates the match if needed and loads the current document.
    pub async fn join(store: Arc<S>, identity: Identity) -> Result<Self, StoreError> {
        let feed = store.subscribe(&identity.match_id);
        let created = initialize(
            &*store,
            &identity.match_id,
            &identity.mode,
            &identity.team_name,
            &identity.opposite_team,
            identity.initial_side,
        )
        .await?;
        debug!(match_id = %identity.match_id, ?created, "Session joined.");

        let mut session = Self {
            store,
            identity,
            feed,
            consumer: ChangeFeedConsumer::new(),
            view: None,
            submitted: None,
        };
        if created != InitOutcome::SameTeamNames {
            session.refresh().await?;
        }
        Ok(session)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn view(&self) -> Option<&MatchDraft> {
        self.view.as_ref()
    }

    pub fn local_step(&self) -> Option<u8> {
        self.view.as_ref()?.active_set().map(|set| set.current_step)
    }

    pub fn my_side(&self) -> Option<Side> {
        let view = self.view.as_ref()?;
        resolve_side(view, &self.identity.team_name, Some(self.identity.initial_side))
    }

    pub fn is_my_turn(&self) -> bool {
        let (Some(step), Some(side)) = (self.local_step(), self.my_side()) else {
            return false;
        };
        matches!(phase_at(step), Some(phase @ (Phase::Ban { .. } | Phase::Pick { .. })) if phase.is_acted_by(side))
    }

    pub async fn ready(&mut self) -> Result<ReadyOutcome, StoreError> {
        mark_ready(
            &*self.store,
            &self.identity.match_id,
            &self.identity.team_name,
            Some(self.identity.initial_side),
        )
        .await
    }

    /// Submits `champion` for the step this client last saw.
    ///
    /// Returns `None` when a submission for that step is already in flight.
    pub async fn submit(&mut self, champion: &str) -> Result<Option<TurnOutcome>, StoreError> {
        let Some(view) = self.view.as_ref() else {
            return Ok(Some(TurnOutcome::MissingDraft));
        };
        let set = view.current_set;
        let Some(step) = self.local_step() else {
            return Ok(Some(TurnOutcome::MissingDraft));
        };
        let Some(action) = phase_at(step).and_then(|phase| phase.action()) else {
            debug!(match_id = %self.identity.match_id, step, "No selection to make at this step.");
            return Ok(None);
        };
        if self.submitted == Some((set, step)) {
            return Ok(None);
        }
        self.submitted = Some((set, step));

        let outcome = apply_turn(
            &*self.store,
            &self.identity.match_id,
            &self.identity.team_name,
            champion,
            action,
            step,
        )
        .await;
        if !matches!(outcome, Ok(TurnOutcome::Applied { .. } | TurnOutcome::Stale { .. })) {
            self.submitted = None;
        }
        outcome.map(Some)
    }

    /// Moves past the swap phase.
    pub async fn finish_swap(&mut self) -> Result<Option<TurnOutcome>, StoreError> {
        match self.local_step() {
            Some(step) if phase_at(step) == Some(Phase::Swap) => {
                advance_step_only(&*self.store, &self.identity.match_id, step).await.map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Signals that this team is done with the set and the next one can be prepared.
    pub async fn prepare_next_set(&mut self) -> Result<bool, StoreError> {
        toggle_preparing(&*self.store, &self.identity.match_id, true).await
    }

    pub async fn start_next_set(
        &mut self,
        side: Side,
        max_sets: u32,
    ) -> Result<NextSetOutcome, StoreError> {
        create_next_set(
            &*self.store,
            &self.identity.match_id,
            side,
            &self.identity.team_name,
            &self.identity.opposite_team,
            max_sets,
        )
        .await
    }

    /// Waits for the next change and reacts to it. `None` once the feed closes.
    pub async fn pump(&mut self) -> Result<Option<Vec<DraftReaction>>, StoreError> {
        match self.feed.next().await {
            Some(FeedEvent::Changed(change)) => self.absorb(change).await.map(Some),
            Some(FeedEvent::Lagged(skipped)) => {
                warn!(match_id = %self.identity.match_id, skipped, "Change feed lagged, re-reading.");
                self.refresh().await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Pumps until `done` holds for the current view.
    pub async fn wait_for<F>(&mut self, mut done: F) -> Result<(), StoreError>
    where
        F: FnMut(&MatchDraft) -> bool,
    {
        while !self.view.as_ref().is_some_and(&mut done) {
            if self.pump().await?.is_none() {
                break;
            }
        }
        Ok(())
    }

    async fn refresh(&mut self) -> Result<Vec<DraftReaction>, StoreError> {
        match self.store.read(&self.identity.match_id).await? {
            Some(change) => self.absorb(change).await,
            None => Ok(Vec::new()),
        }
    }

    async fn absorb(&mut self, change: DraftChange) -> Result<Vec<DraftReaction>, StoreError> {
        let reactions = self.consumer.observe(change.version, &change.draft);
        if self.consumer.last_version() == Some(change.version) {
            self.view = Some(change.draft);
        }

        for reaction in &reactions {
            match reaction {
                DraftReaction::BothReady { .. } => {
                    set_started_at_if_needed(&*self.store, &self.identity.match_id).await?;
                }
                DraftReaction::DraftComplete { .. } => {
                    commit_total_if_needed(&*self.store, &self.identity.match_id, &self.identity.team_name)
                        .await?;
                }
                DraftReaction::StepChanged { .. } | DraftReaction::SetAdvanced { .. } => {
                    self.submitted = None;
                }
                DraftReaction::PreparingChanged { .. } => {}
            }
        }
        Ok(reactions)
    }
}
