//! SQL実行バックエンド
//!
//! `SqlGateway` が判定済みの文を渡す先。結果は列名付きのJSON行に変換する。
//!
//! 判定を通る文は読み取り系のみなので、`SqlGateway` 経由では常に `Select` になる。
//! `Modify` は判定を経ずに `SqlExecutor` を直接使う呼び出し（スキーマ準備など）向け。

use crate::common::error::{ToolsetError, ToolsetResult};
use crate::guard;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// 1文の実行結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SqlOutcome {
    /// 行を返す文
    Select {
        /// 列名（行が0件の場合は空）
        columns: Vec<String>,
        /// 列名をキーにした行
        data: Vec<Map<String, Value>>,
        /// 行数
        row_count: usize,
    },
    /// 行を返さない文（`SqlExecutor` を直接使った場合のみ）
    Modify {
        /// 影響行数
        row_count: u64,
        /// 最後に挿入された行のID
        lastrowid: Option<i64>,
    },
}

impl SqlOutcome {
    /// 返された行数（更新系は影響行数）
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Select { row_count, .. } => *row_count as u64,
            Self::Modify { row_count, .. } => *row_count,
        }
    }

    /// 監査レコードに残す結果の形
    pub fn to_audit_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(ref mut map) = value {
            map.insert("success".to_string(), Value::Bool(true));
        }
        value
    }
}

/// SQLを実行する下位ストア
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// 位置パラメータ付きで1文を実行する
    async fn execute(&self, sql: &str, params: &[Value]) -> ToolsetResult<SqlOutcome>;
}

/// SQLiteファイルに対する実行バックエンド
#[derive(Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// 既存のプールから作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// データベースファイルを開く（なければ作成）
    pub async fn open(path: &Path) -> ToolsetResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| ToolsetError::Config(format!("Invalid SQLite path: {}", e)))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| ToolsetError::Database(format!("Failed to open database: {}", e)))?;
        Ok(Self::new(pool))
    }
}

/// JSONパラメータを順にバインドする
fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.as_str()),
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// 1セルをJSON値に変換する（SQLiteは値ごとに型を持つため順に試す）
fn cell_to_json(row: &SqliteRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        return Value::String(hex);
    }
    Value::Null
}

fn row_to_json(row: &SqliteRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| (col.name().to_string(), cell_to_json(row, idx)))
        .collect()
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> ToolsetResult<SqlOutcome> {
        if guard::starts_with_read_prefix(sql) {
            let rows = bind_params(sqlx::query(sql), params)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ToolsetError::Database(e.to_string()))?;

            let columns = rows
                .first()
                .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
                .unwrap_or_default();
            let data: Vec<_> = rows.iter().map(row_to_json).collect();

            Ok(SqlOutcome::Select {
                columns,
                row_count: data.len(),
                data,
            })
        } else {
            let result = bind_params(sqlx::query(sql), params)
                .execute(&self.pool)
                .await
                .map_err(|e| ToolsetError::Database(e.to_string()))?;

            Ok(SqlOutcome::Modify {
                row_count: result.rows_affected(),
                lastrowid: Some(result.last_insert_rowid()),
            })
        }
    }
}
