//! SQLite checkpoint store.
//!
//! The whole [`RunState`] is stored as JSON; the remaining columns exist
//! for listing runs without decoding every state.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::RunState;
use crate::domain::ports::CheckpointStore;

#[derive(Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    state_json: String,
}

impl TryFrom<CheckpointRow> for RunState {
    type Error = crate::domain::errors::DomainError;

    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        Ok(serde_json::from_str(&row.state_json)?)
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, state: &RunState) -> DomainResult<()> {
        let state_json = serde_json::to_string(state)?;

        sqlx::query(
            r#"INSERT INTO run_checkpoints
               (run_id, topic, phase, iterations, state_json, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(run_id) DO UPDATE SET
                   phase = excluded.phase,
                   iterations = excluded.iterations,
                   state_json = excluded.state_json,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&state.run_id)
        .bind(&state.draft.topic)
        .bind(state.phase.as_str())
        .bind(state.trace.len() as i64)
        .bind(&state_json)
        .bind(state.created_at.to_rfc3339())
        .bind(state.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, run_id: &str) -> DomainResult<Option<RunState>> {
        let row: Option<CheckpointRow> =
            sqlx::query_as("SELECT state_json FROM run_checkpoints WHERE run_id = ?")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(RunState::try_from).transpose()
    }

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<RunState>> {
        let rows: Vec<CheckpointRow> = sqlx::query_as(
            "SELECT state_json FROM run_checkpoints ORDER BY updated_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RunState::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{
        DimensionScores, Draft, IterationRecord, RunPhase, Section, Verdict,
    };

    fn state(run_id: &str) -> RunState {
        RunState::new(
            run_id,
            Draft::new("Vector databases", vec![Section::new("Intro", "Indexes [@hnsw].")]),
        )
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = SqliteCheckpointStore::new(pool);

        let mut saved = state("run-1");
        let verdict = Verdict::genuine(DimensionScores::uniform(3.2), vec!["thin".into()], false);
        saved.trace.push(IterationRecord {
            iteration: 0,
            overall_score: verdict.overall_score(),
            verdict,
            duration_ms: 12,
            targeted: vec![],
            revision_notes: vec![],
            regressed: false,
            draft_digest: saved.draft.digest(),
        });
        saved.phase = RunPhase::Revising;
        store.save(&saved).await.unwrap();

        let loaded = store.load("run-1").await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.load("run-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_run() {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = SqliteCheckpointStore::new(pool);

        let mut s = state("run-1");
        store.save(&s).await.unwrap();
        s.phase = RunPhase::Converged;
        store.save(&s).await.unwrap();

        let all = store.list_recent(10).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phase, RunPhase::Converged);
    }

    #[tokio::test]
    async fn test_list_recent_orders_by_update_time() {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = SqliteCheckpointStore::new(pool);

        let older = state("older");
        let mut newer = state("newer");
        newer.updated_at = older.updated_at + chrono::Duration::seconds(5);
        store.save(&older).await.unwrap();
        store.save(&newer).await.unwrap();

        let recent = store.list_recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].run_id, "newer");
    }
}
