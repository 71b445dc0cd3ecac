use async_trait::async_trait;
use datasync_core::models::{Run, RunState};
use datasync_core::traits::RunRepository;
use datasync_core::{SyncError, SyncResult};
use sqlx::{Row, SqlitePool};
use tracing::debug;

const RUN_COLUMNS: &str = "id, title, experiment_id, machine_id, state, creator, created_at";

pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_run(row: &sqlx::sqlite::SqliteRow) -> SyncResult<Run> {
        let state: String = row.try_get("state")?;
        Ok(Run {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            experiment_id: row.try_get("experiment_id")?,
            machine_id: row.try_get("machine_id")?,
            state: state.parse()?,
            creator: row.try_get("creator")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn find_by_machine(&self, node_id: i64) -> SyncResult<Vec<Run>> {
        let rows = sqlx::query(&format!(
            "SELECT {RUN_COLUMNS} FROM runs WHERE machine_id = $1 ORDER BY id"
        ))
        .bind(node_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SyncError::Database)?;

        rows.iter().map(Self::row_to_run).collect()
    }

    async fn find_by_id(&self, id: i64) -> SyncResult<Option<Run>> {
        let row = sqlx::query(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SyncError::Database)?;

        row.as_ref().map(Self::row_to_run).transpose()
    }

    async fn update_state(&self, id: i64, state: RunState) -> SyncResult<()> {
        let result = sqlx::query("UPDATE runs SET state = $2 WHERE id = $1")
            .bind(id)
            .bind(state.as_str())
            .execute(&self.pool)
            .await
            .map_err(SyncError::Database)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::RunNotFound { id });
        }

        debug!("更新Run状态成功: {} -> {}", id, state.as_str());
        Ok(())
    }
}
