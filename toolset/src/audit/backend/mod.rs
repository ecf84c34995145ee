//! 監査ログバックエンド
//!
//! 3種類の実装（JSONLファイル / SQLite / MySQL）が同じ論理スキーマを共有する。
//! 呼び出し側はバックエンドを意識せず `AuditBackend` 経由で読み書きする。

/// JSONLファイル（日次ローテーション）
pub mod file;
/// MySQL（複数プロセスからの同時書き込み向け）
pub mod mysql;
/// SQLite（ローカルファイル）
pub mod sqlite;

use crate::audit::types::{AuditQuery, AuditRecord};
use crate::common::error::ToolsetResult;
use crate::config::{AuditBackendKind, AuditLogConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use file::FileBackend;
pub use mysql::MySqlBackend;
pub use sqlite::SqliteBackend;

/// 監査ログバックエンドの共通契約
#[async_trait]
pub trait AuditBackend: Send + Sync {
    /// バックエンド名（ログ・ヘルスチェック表示用）
    fn name(&self) -> &'static str;

    /// レコードを1件書き込む
    async fn append(&self, record: &AuditRecord) -> ToolsetResult<()>;

    /// 条件に一致するレコードを新しい順に返す
    async fn query(&self, query: &AuditQuery) -> ToolsetResult<Vec<AuditRecord>>;

    /// `cutoff` より古いレコードを削除し、削除件数を返す
    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> ToolsetResult<u64>;

    /// レコードを書き込み、失敗しても呼び出し元にエラーを返さない
    ///
    /// 失敗時は `false` を返し、警告ログを出す。
    async fn write(&self, record: &AuditRecord) -> bool {
        match self.append(record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    backend = self.name(),
                    actor = %record.actor,
                    "Failed to write audit record: {}",
                    e
                );
                false
            }
        }
    }
}

/// リレーショナルストアの `result` 列を値へ戻す
///
/// JSONとして解釈できない文字列はそのまま文字列値にする。
pub(crate) fn decode_result(stored: Option<String>) -> serde_json::Value {
    match stored {
        Some(text) => serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)),
        None => serde_json::Value::Null,
    }
}

/// 設定に従ってバックエンドを生成
pub async fn from_config(config: &AuditLogConfig) -> ToolsetResult<Arc<dyn AuditBackend>> {
    let backend: Arc<dyn AuditBackend> = match config.backend {
        AuditBackendKind::File => Arc::new(FileBackend::new(
            config.log_dir.clone(),
            config.file_prefix.clone(),
        )),
        AuditBackendKind::Sqlite => Arc::new(SqliteBackend::open(&config.sqlite_path).await?),
        AuditBackendKind::MySql => Arc::new(MySqlBackend::connect(&config.mysql).await?),
    };
    tracing::info!(backend = backend.name(), "Audit log backend initialized");
    Ok(backend)
}
