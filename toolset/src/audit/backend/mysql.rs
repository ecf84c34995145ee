//! MySQL監査ログバックエンド
//!
//! SQLiteバックエンドと同じ論理スキーマを `DATETIME(6)` 列で保持する。
//! 複数プロセスからの同時書き込みはストア側のトランザクションに任せる。

use super::AuditBackend;
use crate::audit::types::{AuditQuery, AuditRecord};
use crate::common::error::{ToolsetError, ToolsetResult};
use crate::config::MySqlConfig;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS execution_logs (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    user_name VARCHAR(255) NOT NULL,
    command LONGTEXT NOT NULL,
    result LONGTEXT,
    execution_time DATETIME(6) NOT NULL,
    time_cost_ms BIGINT,
    command_type VARCHAR(32) NOT NULL DEFAULT 'sql',
    created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
    INDEX idx_user_time (user_name, execution_time),
    INDEX idx_execution_time (execution_time)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct ExecutionLogRow {
    id: i64,
    user_name: String,
    command: String,
    result: Option<String>,
    execution_time: NaiveDateTime,
    time_cost_ms: Option<i64>,
    command_type: String,
}

impl From<ExecutionLogRow> for AuditRecord {
    fn from(row: ExecutionLogRow) -> Self {
        AuditRecord {
            id: Some(row.id),
            timestamp: row.execution_time.and_utc(),
            actor: row.user_name,
            command: row.command,
            result: super::decode_result(row.result),
            time_cost_ms: row.time_cost_ms.unwrap_or(0).max(0) as u64,
            command_type: row.command_type,
        }
    }
}

/// MySQLに保存する監査ログバックエンド
#[derive(Clone)]
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// 接続パラメータから接続し、スキーマを用意する
    pub async fn connect(config: &MySqlConfig) -> ToolsetResult<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| {
                ToolsetError::Database(format!(
                    "Failed to connect to MySQL at {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        Self::new(pool).await
    }

    /// 既存のプールからバックエンドを作成し、スキーマを用意する
    pub async fn new(pool: MySqlPool) -> ToolsetResult<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| {
                ToolsetError::Database(format!("Failed to create execution_logs: {}", e))
            })?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl AuditBackend for MySqlBackend {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn append(&self, record: &AuditRecord) -> ToolsetResult<()> {
        let result = serde_json::to_string(&record.result)?;
        let time_cost_ms = i64::try_from(record.time_cost_ms).unwrap_or(i64::MAX);

        sqlx::query(
            r#"INSERT INTO execution_logs (
                user_name, command, result, execution_time, time_cost_ms, command_type
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&record.actor)
        .bind(&record.command)
        .bind(result)
        .bind(record.timestamp.naive_utc())
        .bind(time_cost_ms)
        .bind(&record.command_type)
        .execute(&self.pool)
        .await
        .map_err(|e| ToolsetError::Database(format!("Failed to insert execution log: {}", e)))?;

        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> ToolsetResult<Vec<AuditRecord>> {
        let mut sql = String::from(
            "SELECT id, user_name, command, result, execution_time, time_cost_ms, command_type \
             FROM execution_logs",
        );
        let mut conditions: Vec<&str> = Vec::new();
        if query.actor.is_some() {
            conditions.push("user_name = ?");
        }
        if query.start.is_some() {
            conditions.push("execution_time >= ?");
        }
        if query.end.is_some() {
            conditions.push("execution_time <= ?");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY execution_time DESC, id DESC LIMIT ?");

        let mut q = sqlx::query_as::<_, ExecutionLogRow>(&sql);
        if let Some(ref actor) = query.actor {
            q = q.bind(actor.as_str());
        }
        if let Some(ref start) = query.start {
            q = q.bind(start.naive_utc());
        }
        if let Some(ref end) = query.end {
            q = q.bind(end.naive_utc());
        }
        q = q.bind(i64::try_from(query.limit).unwrap_or(i64::MAX));

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ToolsetError::Database(format!("Failed to query execution logs: {}", e)))?;

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> ToolsetResult<u64> {
        let result = sqlx::query("DELETE FROM execution_logs WHERE execution_time < ?")
            .bind(cutoff.naive_utc())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                ToolsetError::Database(format!("Failed to delete execution logs: {}", e))
            })?;
        Ok(result.rows_affected())
    }
}
