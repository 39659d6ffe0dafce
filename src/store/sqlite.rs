use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::dto::draft_dto::MatchDraft;
use crate::error::StoreError;
use crate::store::{
    change_channel, DraftChange, DraftFeed, DraftStore, RetryPolicy, TxDecision, COLLECTION,
};

#[derive(Debug, FromRow)]
struct DocumentRow {
    version: i64,
    body: String,
}

/// Draft documents persisted as JSON text, one row per (collection, match id).
pub struct SqliteStore {
    pool: SqlitePool,
    changes: broadcast::Sender<DraftChange>,
    retry: RetryPolicy,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, retry: RetryPolicy) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        info!("Connected to sqlite database.");
        Self::with_pool(pool, retry).await
    }

    /// A private in-memory database. Pinned to one connection so it outlives idle reaping.
    pub async fn in_memory(retry: RetryPolicy) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool, retry).await
    }

    pub async fn with_pool(pool: SqlitePool, retry: RetryPolicy) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                version INTEGER NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool, changes: change_channel(), retry })
    }

    async fn fetch(&self, match_id: &str) -> Result<Option<(i64, MatchDraft)>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT version, body FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(COLLECTION)
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some((row.version, serde_json::from_str(&row.body)?))),
            None => Ok(None),
        }
    }

    /// Inserts version 1 unless a row already exists. Returns whether it inserted.
    async fn insert_if_absent(
        &self,
        match_id: &str,
        draft: &MatchDraft,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let body = serde_json::to_string(draft)?;
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, version, body, updated_at)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT(collection, id) DO NOTHING
            "#,
        )
        .bind(COLLECTION)
        .bind(match_id)
        .bind(body)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Writes `draft` only if the row is still at `expected_version`.
    async fn compare_and_swap(
        &self,
        match_id: &str,
        expected_version: i64,
        draft: &MatchDraft,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let body = serde_json::to_string(draft)?;
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = ?, version = version + 1, updated_at = ?
            WHERE collection = ? AND id = ? AND version = ?
            "#,
        )
        .bind(body)
        .bind(now.to_rfc3339())
        .bind(COLLECTION)
        .bind(match_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    fn publish(&self, match_id: &str, version: i64, draft: MatchDraft) {
        let _ = self.changes.send(DraftChange { match_id: match_id.to_string(), version, draft });
    }
}

impl DraftStore for SqliteStore {
    async fn read(&self, match_id: &str) -> Result<Option<DraftChange>, StoreError> {
        Ok(self.fetch(match_id).await?.map(|(version, draft)| DraftChange {
            match_id: match_id.to_string(),
            version,
            draft,
        }))
    }

    async fn create(&self, match_id: &str, draft: MatchDraft) -> Result<bool, StoreError> {
        let created = self.insert_if_absent(match_id, &draft, Utc::now()).await?;
        if created {
            self.publish(match_id, 1, draft);
        }
        Ok(created)
    }

    async fn transaction<F, R>(&self, match_id: &str, mut f: F) -> Result<R, StoreError>
    where
        F: FnMut(Option<&MatchDraft>, DateTime<Utc>) -> TxDecision<R> + Send,
        R: Send,
    {
        for attempt in 1..=self.retry.max_attempts {
            let snapshot = self.fetch(match_id).await?;
            let now = Utc::now();

            let (next, result) = match f(snapshot.as_ref().map(|(_, draft)| draft), now) {
                TxDecision::Abort(result) => return Ok(result),
                TxDecision::Commit(next, result) => (next, result),
            };

            let (committed, version) = match &snapshot {
                Some((read_version, _)) => (
                    self.compare_and_swap(match_id, *read_version, &next, now).await?,
                    read_version + 1,
                ),
                None => (self.insert_if_absent(match_id, &next, now).await?, 1),
            };

            if committed {
                self.publish(match_id, version, next);
                return Ok(result);
            }

            debug!(match_id, attempt, "sqlite transaction conflicted, retrying");
            self.retry.backoff(attempt).await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::draft_dto::Side;

    fn sample() -> MatchDraft {
        MatchDraft::new("blind", "TeamA", "TeamB", Side::Blue)
    }

    #[tokio::test]
    async fn create_is_insert_if_absent() {
        let store = SqliteStore::in_memory(RetryPolicy::default()).await.unwrap();
        assert!(store.create("M1", sample()).await.unwrap());
        assert!(!store.create("M1", sample()).await.unwrap());
        assert_eq!(store.get("M1").await.unwrap(), Some(sample()));
        assert_eq!(store.get("M2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_version_does_not_swap() {
        let store = SqliteStore::in_memory(RetryPolicy::default()).await.unwrap();
        store.create("M1", sample()).await.unwrap();
        store.update("M1", |draft, _| draft.is_next_set_preparing = true).await.unwrap();

        let mut stale = sample();
        stale.current_set = 7;
        assert!(!store.compare_and_swap("M1", 1, &stale, Utc::now()).await.unwrap());

        let live = store.get("M1").await.unwrap().unwrap();
        assert!(live.is_next_set_preparing);
        assert_eq!(live.current_set, 1);
    }

    #[tokio::test]
    async fn transaction_commit_is_broadcast_with_new_version() {
        let store = SqliteStore::in_memory(RetryPolicy::default()).await.unwrap();
        store.create("M1", sample()).await.unwrap();
        let mut feed = store.subscribe("M1");

        store
            .transaction("M1", |snapshot, _| {
                let mut next = snapshot.cloned().unwrap();
                next.mode = "fearless".to_string();
                TxDecision::Commit(next, ())
            })
            .await
            .unwrap();

        match feed.next().await {
            Some(crate::store::FeedEvent::Changed(change)) => {
                assert_eq!(change.version, 2);
                assert_eq!(change.draft.mode, "fearless");
            }
            other => panic!("unexpected feed event {other:?}"),
        }
    }
}
