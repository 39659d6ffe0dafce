//! Transactional document store holding one `MatchDraft` per match.
//!
//! Every committed write bumps the document's version. Transactions read a
//! snapshot, let the caller decide what to write, and commit only if the
//! version is still the one that was read; otherwise they retry.

pub mod memory;
pub mod sqlite;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::broadcast;

use crate::dto::draft_dto::MatchDraft;
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const COLLECTION: &str = "banPickSimulations";

const FEED_CAPACITY: usize = 256;

/// What a transaction closure wants done with the snapshot it was shown.
pub enum TxDecision<R> {
    Commit(MatchDraft, R),
    Abort(R),
}

/// A committed version of one match document.
#[derive(Debug, Clone)]
pub struct DraftChange {
    pub match_id: String,
    pub version: i64,
    pub draft: MatchDraft,
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    Changed(DraftChange),
    /// The receiver fell behind and this many snapshots were dropped.
    Lagged(u64),
}

/// Live change feed for a single match. Dropping it unsubscribes.
pub struct DraftFeed {
    match_id: String,
    rx: broadcast::Receiver<DraftChange>,
}

impl DraftFeed {
    pub(crate) fn new(match_id: &str, rx: broadcast::Receiver<DraftChange>) -> Self {
        Self { match_id: match_id.to_string(), rx }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Waits for the next commit on this match. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.match_id == self.match_id => {
                    return Some(FeedEvent::Changed(change));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Some(FeedEvent::Lagged(skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

pub(crate) fn change_channel() -> broadcast::Sender<DraftChange> {
    broadcast::channel(FEED_CAPACITY).0
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, base_backoff: Duration::from_millis(10) }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1), ..Self::default() }
    }

    /// Linear backoff with full jitter so two racing clients spread out.
    pub(crate) async fn backoff(&self, attempt: u32) {
        let ceiling = self.base_backoff.as_millis() as u64 * u64::from(attempt);
        let millis = rand::rng().random_range(0..=ceiling);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

pub trait DraftStore: Send + Sync + 'static {
    /// The latest committed version of the document, if any.
    fn read(
        &self,
        match_id: &str,
    ) -> impl Future<Output = Result<Option<DraftChange>, StoreError>> + Send;

    /// Inserts the document only if nothing exists under `match_id`.
    /// Returns `true` when this call created it.
    fn create(
        &self,
        match_id: &str,
        draft: MatchDraft,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Runs `f` against a snapshot and commits its decision only if the
    /// document is still at the snapshot's version, retrying on conflict.
    /// `f` also receives the commit time for this attempt.
    fn transaction<F, R>(
        &self,
        match_id: &str,
        f: F,
    ) -> impl Future<Output = Result<R, StoreError>> + Send
    where
        F: FnMut(Option<&MatchDraft>, DateTime<Utc>) -> TxDecision<R> + Send,
        R: Send;

    fn subscribe(&self, match_id: &str) -> DraftFeed;

    fn get(
        &self,
        match_id: &str,
    ) -> impl Future<Output = Result<Option<MatchDraft>, StoreError>> + Send {
        async move { Ok(self.read(match_id).await?.map(|change| change.draft)) }
    }

    /// Merges `patch` into the latest version of an existing document.
    fn update<F>(
        &self,
        match_id: &str,
        mut patch: F,
    ) -> impl Future<Output = Result<(), StoreError>> + Send
    where
        F: FnMut(&mut MatchDraft, DateTime<Utc>) + Send,
    {
        async move {
            let found = self
                .transaction(match_id, |snapshot, now| match snapshot {
                    Some(current) => {
                        let mut next = current.clone();
                        patch(&mut next, now);
                        TxDecision::Commit(next, true)
                    }
                    None => TxDecision::Abort(false),
                })
                .await?;
            if found { Ok(()) } else { Err(StoreError::NotFound(match_id.to_string())) }
        }
    }
}
