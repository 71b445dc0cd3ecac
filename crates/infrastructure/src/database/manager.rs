use anyhow::{Context, Result};
use datasync_core::config::models::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config
            .file_path()
            .and_then(|path| std::path::Path::new(path).parent())
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建数据库目录失败: {}", parent.display()))?;
        }

        // 启用外键约束和WAL模式
        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .context("解析数据库URL失败")?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(connect_options)
            .await
            .context("创建数据库连接池失败")?;

        info!(url = %config.url, "SQLite连接池已创建");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 建表，可重复执行
    pub async fn migrate(&self) -> Result<()> {
        info!("运行SQLite数据库迁移");
        let pool = &self.pool;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS node_clients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                organisation_name TEXT NOT NULL,
                site_name TEXT NOT NULL,
                station_name TEXT NOT NULL,
                hostname TEXT,
                username TEXT,
                flags TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (organisation_name, site_name, station_name)
            )
            "#,
        )
        .execute(pool)
        .await
        .context("创建节点表失败")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS node_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_node_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                FOREIGN KEY (parent_node_id) REFERENCES node_clients (id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await
        .context("创建节点规则表失败")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                experiment_id INTEGER,
                machine_id INTEGER NOT NULL,
                state TEXT NOT NULL DEFAULT 'NEW',
                creator TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (machine_id) REFERENCES node_clients (id)
            )
            "#,
        )
        .execute(pool)
        .await
        .context("创建Run表失败")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS run_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id INTEGER NOT NULL,
                sample_id INTEGER NOT NULL,
                filename TEXT,
                complete BOOLEAN NOT NULL DEFAULT 0,
                sequence INTEGER NOT NULL DEFAULT 0,
                vial_number INTEGER,
                method_number INTEGER,
                FOREIGN KEY (run_id) REFERENCES runs (id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await
        .context("创建RunSample表失败")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_node_rules_parent ON node_rules(parent_node_id)")
            .execute(pool)
            .await
            .context("创建节点规则索引失败")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_machine_id ON runs(machine_id)")
            .execute(pool)
            .await
            .context("创建Run节点索引失败")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_run_samples_run_id ON run_samples(run_id)")
            .execute(pool)
            .await
            .context("创建RunSample索引失败")?;

        info!("数据库迁移完成");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
