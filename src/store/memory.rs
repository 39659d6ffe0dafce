use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::dto::draft_dto::MatchDraft;
use crate::error::StoreError;
use crate::store::{change_channel, DraftChange, DraftFeed, DraftStore, RetryPolicy, TxDecision};

#[derive(Debug, Clone)]
struct Versioned {
    version: i64,
    draft: MatchDraft,
}

/// In-process store with the same optimistic commit rules as the SQLite one.
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Versioned>>,
    changes: broadcast::Sender<DraftChange>,
    retry: RetryPolicy,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl MemoryStore {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { docs: RwLock::new(HashMap::new()), changes: change_channel(), retry }
    }

    pub async fn version(&self, match_id: &str) -> Option<i64> {
        self.docs.read().await.get(match_id).map(|doc| doc.version)
    }

    fn publish(&self, match_id: &str, version: i64, draft: MatchDraft) {
        // No subscribers is not an error.
        let _ = self.changes.send(DraftChange { match_id: match_id.to_string(), version, draft });
    }
}

impl DraftStore for MemoryStore {
    async fn read(&self, match_id: &str) -> Result<Option<DraftChange>, StoreError> {
        Ok(self.docs.read().await.get(match_id).map(|doc| DraftChange {
            match_id: match_id.to_string(),
            version: doc.version,
            draft: doc.draft.clone(),
        }))
    }

    async fn create(&self, match_id: &str, draft: MatchDraft) -> Result<bool, StoreError> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(match_id) {
            return Ok(false);
        }
        docs.insert(match_id.to_string(), Versioned { version: 1, draft: draft.clone() });
        // Published under the lock so feed order matches commit order.
        self.publish(match_id, 1, draft);
        Ok(true)
    }

    async fn transaction<F, R>(&self, match_id: &str, mut f: F) -> Result<R, StoreError>
    where
        F: FnMut(Option<&MatchDraft>, DateTime<Utc>) -> TxDecision<R> + Send,
        R: Send,
    {
        for attempt in 1..=self.retry.max_attempts {
            let snapshot = self.docs.read().await.get(match_id).cloned();
            let read_version = snapshot.as_ref().map_or(0, |doc| doc.version);

            let (next, result) = match f(snapshot.as_ref().map(|doc| &doc.draft), Utc::now()) {
                TxDecision::Abort(result) => return Ok(result),
                TxDecision::Commit(next, result) => (next, result),
            };

            let mut docs = self.docs.write().await;
            let live_version = docs.get(match_id).map_or(0, |doc| doc.version);
            if live_version != read_version {
                drop(docs);
                debug!(match_id, attempt, "memory transaction conflicted, retrying");
                self.retry.backoff(attempt).await;
                continue;
            }

            let version = read_version + 1;
            docs.insert(match_id.to_string(), Versioned { version, draft: next.clone() });
            self.publish(match_id, version, next);
            return Ok(result);
        }

        Err(StoreError::Contention {
            match_id: match_id.to_string(),
            attempts: self.retry.max_attempts,
        })
    }

    fn subscribe(&self, match_id: &str) -> DraftFeed {
        DraftFeed::new(match_id, self.changes.subscribe())
    }
}
