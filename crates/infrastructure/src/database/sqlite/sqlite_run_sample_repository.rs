use async_trait::async_trait;
use datasync_core::models::RunSample;
use datasync_core::traits::RunSampleRepository;
use datasync_core::{SyncError, SyncResult};
use sqlx::{Row, SqlitePool};
use tracing::debug;

const SAMPLE_COLUMNS: &str =
    "id, run_id, sample_id, filename, complete, sequence, vial_number, method_number";

/// RunSample 仓储
///
/// 每个写操作都是独立的自动提交语句，不加行锁。
pub struct SqliteRunSampleRepository {
    pool: SqlitePool,
}

impl SqliteRunSampleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_sample(row: &sqlx::sqlite::SqliteRow) -> SyncResult<RunSample> {
        Ok(RunSample {
            id: row.try_get("id")?,
            run_id: row.try_get("run_id")?,
            sample_id: row.try_get("sample_id")?,
            filename: row.try_get("filename")?,
            complete: row.try_get("complete")?,
            sequence: row.try_get("sequence")?,
            vial_number: row.try_get("vial_number")?,
            method_number: row.try_get("method_number")?,
        })
    }
}

#[async_trait]
impl RunSampleRepository for SqliteRunSampleRepository {
    async fn find_by_id(&self, id: i64) -> SyncResult<Option<RunSample>> {
        let row = sqlx::query(&format!("SELECT {SAMPLE_COLUMNS} FROM run_samples WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SyncError::Database)?;

        row.as_ref().map(Self::row_to_sample).transpose()
    }

    async fn find_with_files_by_run(&self, run_id: i64) -> SyncResult<Vec<RunSample>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SAMPLE_COLUMNS} FROM run_samples
            WHERE run_id = $1 AND filename IS NOT NULL AND filename != ''
            ORDER BY sequence, id
            "#
        ))
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SyncError::Database)?;

        rows.iter().map(Self::row_to_sample).collect()
    }

    async fn set_complete(&self, id: i64, complete: bool) -> SyncResult<()> {
        let result = sqlx::query("UPDATE run_samples SET complete = $2 WHERE id = $1")
            .bind(id)
            .bind(complete)
            .execute(&self.pool)
            .await
            .map_err(SyncError::Database)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::RunSampleNotFound { id });
        }

        debug!("更新RunSample完成标记: {} -> {}", id, complete);
        Ok(())
    }

    async fn mark_all_complete(&self, run_id: i64) -> SyncResult<u64> {
        let result = sqlx::query("UPDATE run_samples SET complete = 1 WHERE run_id = $1")
            .bind(run_id)
            .execute(&self.pool)
            .await
            .map_err(SyncError::Database)?;

        debug!("Run {} 的 {} 个样本已标记完成", run_id, result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn update(&self, sample: &RunSample) -> SyncResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE run_samples
            SET filename = $2, sequence = $3, vial_number = $4, method_number = $5
            WHERE id = $1
            "#,
        )
        .bind(sample.id)
        .bind(&sample.filename)
        .bind(sample.sequence)
        .bind(sample.vial_number)
        .bind(sample.method_number)
        .execute(&self.pool)
        .await
        .map_err(SyncError::Database)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::RunSampleNotFound { id: sample.id });
        }

        debug!("更新RunSample成功: {}", sample.id);
        Ok(())
    }
}
