use async_trait::async_trait;
use datasync_core::models::{NewNodeClient, NodeClient, NodeKey, NodeRule};
use datasync_core::traits::NodeClientRepository;
use datasync_core::{SyncError, SyncResult};
use sqlx::{Row, SqlitePool};
use tracing::debug;

const NODE_COLUMNS: &str =
    "id, organisation_name, site_name, station_name, hostname, username, flags, created_at";

pub struct SqliteNodeClientRepository {
    pool: SqlitePool,
}

impl SqliteNodeClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_node(row: &sqlx::sqlite::SqliteRow) -> SyncResult<NodeClient> {
        Ok(NodeClient {
            id: row.try_get("id")?,
            organisation_name: row.try_get("organisation_name")?,
            site_name: row.try_get("site_name")?,
            station_name: row.try_get("station_name")?,
            hostname: row.try_get("hostname")?,
            username: row.try_get("username")?,
            flags: row.try_get("flags")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl NodeClientRepository for SqliteNodeClientRepository {
    async fn find_by_key(&self, key: &NodeKey) -> SyncResult<Option<NodeClient>> {
        let row = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM node_clients WHERE organisation_name = $1 AND site_name = $2 AND station_name = $3"
        ))
        .bind(&key.organisation)
        .bind(&key.site)
        .bind(&key.station)
        .fetch_optional(&self.pool)
        .await
        .map_err(SyncError::Database)?;

        row.as_ref().map(Self::row_to_node).transpose()
    }

    async fn find_by_id(&self, id: i64) -> SyncResult<Option<NodeClient>> {
        let row = sqlx::query(&format!("SELECT {NODE_COLUMNS} FROM node_clients WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SyncError::Database)?;

        row.as_ref().map(Self::row_to_node).transpose()
    }

    async fn list(&self) -> SyncResult<Vec<NodeClient>> {
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM node_clients ORDER BY organisation_name, site_name, station_name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(SyncError::Database)?;

        rows.iter().map(Self::row_to_node).collect()
    }

    async fn create(&self, node: &NewNodeClient) -> SyncResult<NodeClient> {
        let result = sqlx::query(
            r#"
            INSERT INTO node_clients (organisation_name, site_name, station_name, hostname, username, flags)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&node.organisation_name)
        .bind(&node.site_name)
        .bind(&node.station_name)
        .bind(&node.hostname)
        .bind(&node.username)
        .bind(&node.flags)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                SyncError::NodeAlreadyExists {
                    key: node.key().to_string(),
                }
            }
            other => SyncError::Database(other),
        })?;

        let id = result.last_insert_rowid();
        debug!("注册节点成功: {} (id={})", node.key(), id);
        self.find_by_id(id)
            .await?
            .ok_or(SyncError::NodeIdNotFound { id })
    }

    async fn update(&self, node: &NodeClient) -> SyncResult<()> {
        let result = sqlx::query(
            "UPDATE node_clients SET hostname = $2, username = $3, flags = $4 WHERE id = $1",
        )
        .bind(node.id)
        .bind(&node.hostname)
        .bind(&node.username)
        .bind(&node.flags)
        .execute(&self.pool)
        .await
        .map_err(SyncError::Database)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::NodeIdNotFound { id: node.id });
        }

        debug!("更新节点成功: {}", node.key());
        Ok(())
    }

    async fn rules_for(&self, node_id: i64) -> SyncResult<Vec<NodeRule>> {
        let rows = sqlx::query(
            "SELECT id, parent_node_id, description FROM node_rules WHERE parent_node_id = $1 ORDER BY id",
        )
        .bind(node_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SyncError::Database)?;

        rows.iter()
            .map(|row| {
                Ok(NodeRule {
                    id: row.try_get("id")?,
                    parent_node_id: row.try_get("parent_node_id")?,
                    description: row.try_get("description")?,
                })
            })
            .collect()
    }

    async fn add_rule(&self, node_id: i64, description: &str) -> SyncResult<NodeRule> {
        let result = sqlx::query("INSERT INTO node_rules (parent_node_id, description) VALUES ($1, $2)")
            .bind(node_id)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(SyncError::Database)?;

        debug!("添加节点规则成功: node_id={}", node_id);
        Ok(NodeRule {
            id: result.last_insert_rowid(),
            parent_node_id: node_id,
            description: description.to_string(),
        })
    }
}
