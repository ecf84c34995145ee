//! SQLite監査ログバックエンド
//!
//! `execution_logs` テーブルに1レコード1行で保存する。
//! `execution_time` は固定幅のRFC 3339文字列（マイクロ秒・`Z`）で保存するため、
//! 文字列比較がそのまま時系列比較になる。

use super::AuditBackend;
use crate::audit::types::{AuditQuery, AuditRecord};
use crate::common::error::{ToolsetError, ToolsetResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// テーブル定義
const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS execution_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_name TEXT NOT NULL,
    command TEXT NOT NULL,
    result TEXT,
    execution_time TEXT NOT NULL,
    time_cost_ms INTEGER,
    command_type TEXT NOT NULL DEFAULT 'sql',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_user_time ON execution_logs(user_name, execution_time)",
    "CREATE INDEX IF NOT EXISTS idx_execution_time ON execution_logs(execution_time)",
];

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct ExecutionLogRow {
    id: i64,
    user_name: String,
    command: String,
    result: Option<String>,
    execution_time: String,
    time_cost_ms: Option<i64>,
    command_type: String,
}

impl TryFrom<ExecutionLogRow> for AuditRecord {
    type Error = ToolsetError;

    fn try_from(row: ExecutionLogRow) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(&row.execution_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ToolsetError::Database(format!("Failed to parse execution_time: {}", e)))?;

        Ok(AuditRecord {
            id: Some(row.id),
            timestamp,
            actor: row.user_name,
            command: row.command,
            result: super::decode_result(row.result),
            time_cost_ms: row.time_cost_ms.unwrap_or(0).max(0) as u64,
            command_type: row.command_type,
        })
    }
}

/// 保存・比較用の時刻表現
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLiteに保存する監査ログバックエンド
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// ファイルを開き（なければ作成）、スキーマを用意する
    pub async fn open(path: &Path) -> ToolsetResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| ToolsetError::Config(format!("Invalid SQLite path: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| ToolsetError::Database(format!("Failed to open audit database: {}", e)))?;

        Self::new(pool).await
    }

    /// 既存のプールからバックエンドを作成し、スキーマを用意する
    pub async fn new(pool: SqlitePool) -> ToolsetResult<Self> {
        let backend = Self { pool };
        backend.ensure_schema().await?;
        Ok(backend)
    }

    /// テーブルとインデックスを作成（冪等）
    async fn ensure_schema(&self) -> ToolsetResult<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                ToolsetError::Database(format!("Failed to create execution_logs: {}", e))
            })?;

        for ddl in CREATE_INDEXES {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| ToolsetError::Database(format!("Failed to create index: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuditBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
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
        .bind(format_time(&record.timestamp))
        .bind(time_cost_ms)
        .bind(&record.command_type)
        .execute(&self.pool)
        .await
        .map_err(|e| ToolsetError::Database(format!("Failed to insert execution log: {}", e)))?;

        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> ToolsetResult<Vec<AuditRecord>> {
        let (where_clause, bind_values) = build_where_clause(query);
        let sql = format!(
            "SELECT id, user_name, command, result, execution_time, time_cost_ms, command_type \
             FROM execution_logs {} ORDER BY execution_time DESC, id DESC LIMIT ?",
            where_clause
        );

        let mut q = sqlx::query_as::<_, ExecutionLogRow>(&sql);
        for val in &bind_values {
            q = q.bind(val.as_str());
        }
        q = q.bind(i64::try_from(query.limit).unwrap_or(i64::MAX));

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ToolsetError::Database(format!("Failed to query execution logs: {}", e)))?;

        rows.into_iter()
            .map(AuditRecord::try_from)
            .collect::<Result<Vec<_>, _>>()
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> ToolsetResult<u64> {
        let result = sqlx::query("DELETE FROM execution_logs WHERE execution_time < ?")
            .bind(format_time(&cutoff))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                ToolsetError::Database(format!("Failed to delete execution logs: {}", e))
            })?;
        Ok(result.rows_affected())
    }
}

/// フィルタからWHERE句とバインド値を構築
fn build_where_clause(query: &AuditQuery) -> (String, Vec<String>) {
    let mut conditions: Vec<&str> = Vec::new();
    let mut bind_values: Vec<String> = Vec::new();

    if let Some(ref actor) = query.actor {
        conditions.push("user_name = ?");
        bind_values.push(actor.clone());
    }

    if let Some(ref start) = query.start {
        conditions.push("execution_time >= ?");
        bind_values.push(format_time(start));
    }

    if let Some(ref end) = query.end {
        conditions.push("execution_time <= ?");
        bind_values.push(format_time(end));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values)
}
