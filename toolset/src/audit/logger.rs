//! 監査ロガー
//!
//! プロセスで1つのバックエンドを保持し、実行されたコマンドを記録する。
//! 書き込み失敗は呼び出し元へ返さず、件数だけを数える。

use super::backend::{self, AuditBackend};
use super::types::{AuditQuery, AuditRecord, DEFAULT_COMMAND_TYPE};
use crate::common::error::ToolsetResult;
use crate::config::{AuditLogConfig, DEFAULT_MAX_RESULT_BYTES};
use crate::diagnostics::RequestContext;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 切り詰めた結果の末尾に付ける印
const TRUNCATION_MARKER: &str = "...(truncated)";

/// 監査ロガー
pub struct AuditLogger {
    backend: Arc<dyn AuditBackend>,
    max_result_bytes: usize,
    failed_writes: AtomicU64,
}

impl AuditLogger {
    /// 指定バックエンドでロガーを作成
    pub fn new(backend: Arc<dyn AuditBackend>) -> Self {
        Self {
            backend,
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            failed_writes: AtomicU64::new(0),
        }
    }

    /// 結果の最大サイズを指定
    pub fn with_max_result_bytes(mut self, max_result_bytes: usize) -> Self {
        self.max_result_bytes = max_result_bytes;
        self
    }

    /// 設定からバックエンドを解決してロガーを作成
    pub async fn from_config(config: &AuditLogConfig) -> ToolsetResult<Self> {
        let backend = backend::from_config(config).await?;
        Ok(Self::new(backend).with_max_result_bytes(config.max_result_bytes))
    }

    /// 使用中のバックエンド
    pub fn backend(&self) -> &Arc<dyn AuditBackend> {
        &self.backend
    }

    /// コマンドの実行を記録する（種別 "sql"）
    pub async fn log_execution(
        &self,
        ctx: &mut RequestContext,
        command: &str,
        result: Value,
        elapsed_ms: u64,
    ) {
        self.log_execution_typed(ctx, command, result, elapsed_ms, DEFAULT_COMMAND_TYPE)
            .await;
    }

    /// コマンド種別を指定して実行を記録する
    ///
    /// 実行者はコンテキストから解決する。書き込みに失敗しても何も返さない。
    pub async fn log_execution_typed(
        &self,
        ctx: &mut RequestContext,
        command: &str,
        result: Value,
        elapsed_ms: u64,
        command_type: &str,
    ) {
        let record = AuditRecord::new(
            ctx.actor(),
            command,
            truncate_result(result, self.max_result_bytes),
            elapsed_ms,
        )
        .with_command_type(command_type);

        if !self.backend.write(&record).await {
            let total = self.failed_writes.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(total, "Audit write failure counted");
        }
        ctx.push_execution_log(record);
    }

    /// 書き込みに失敗した累計件数
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// バックエンドを検索
    pub async fn query(&self, query: &AuditQuery) -> ToolsetResult<Vec<AuditRecord>> {
        self.backend.query(query).await
    }

    /// `cutoff` より古いレコードを削除
    pub async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> ToolsetResult<u64> {
        self.backend.cleanup_before(cutoff).await
    }
}

/// シリアライズ後のサイズが上限を超える結果を文字列に切り詰める
pub fn truncate_result(result: Value, max_bytes: usize) -> Value {
    let serialized = match &result {
        Value::String(s) => {
            if s.len() <= max_bytes {
                return result;
            }
            s.clone()
        }
        other => match serde_json::to_string(other) {
            Ok(text) if text.len() <= max_bytes => return result,
            Ok(text) => text,
            Err(_) => return result,
        },
    };

    let mut cut = max_bytes.min(serialized.len());
    while !serialized.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}{}", &serialized[..cut], TRUNCATION_MARKER))
}
