//! データアクセスラッパー
//!
//! 下位ストアへの問い合わせはすべて `SqlGateway::run` を通る。
//! 安全判定 → 実行 → 計時 → 監査記録 の順に処理し、
//! 失敗は診断エントリとタグ付きの結果として呼び出し元へ返す。

/// SQL実行バックエンド
pub mod executor;

use crate::audit::AuditLogger;
use crate::diagnostics::RequestContext;
use crate::guard;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub use executor::{SqlExecutor, SqlOutcome, SqliteExecutor};

/// 診断エントリに載せるSQL文の最大文字数
const PREVIEW_CHARS: usize = 100;

/// データアクセスの失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// 安全判定で拒否された（ストアには到達していない）
    #[error("Statement rejected: {reason}")]
    PolicyViolation {
        /// 拒否理由
        reason: String,
    },
    /// ストアでの実行に失敗した
    #[error("SQL execution failed: {message}")]
    OperationFailure {
        /// ストアからのエラー
        message: String,
    },
}

/// データアクセスの唯一の窓口
pub struct SqlGateway {
    executor: Arc<dyn SqlExecutor>,
    logger: Arc<AuditLogger>,
    audit_rejected: bool,
}

impl SqlGateway {
    /// 新しいゲートウェイを作成
    pub fn new(executor: Arc<dyn SqlExecutor>, logger: Arc<AuditLogger>) -> Self {
        Self {
            executor,
            logger,
            audit_rejected: false,
        }
    }

    /// 拒否された文も監査レコードとして残すかどうか
    pub fn with_audit_rejected(mut self, audit_rejected: bool) -> Self {
        self.audit_rejected = audit_rejected;
        self
    }

    /// 監査ロガー
    pub fn logger(&self) -> &Arc<AuditLogger> {
        &self.logger
    }

    /// 文を判定し、許可されれば実行して監査記録を残す
    pub async fn run(
        &self,
        ctx: &mut RequestContext,
        sql: &str,
        params: &[Value],
    ) -> Result<SqlOutcome, AccessError> {
        let decision = guard::classify(sql);
        if !decision.allowed {
            tracing::info!(reason = %decision.reason, "SQL statement rejected");
            ctx.show_error(decision.reason.clone(), Some("SQL Security Check"));
            if self.audit_rejected {
                let result = json!({
                    "success": false,
                    "type": "rejected",
                    "reason": decision.reason,
                });
                self.logger.log_execution(ctx, sql, result, 0).await;
            }
            return Err(AccessError::PolicyViolation {
                reason: decision.reason,
            });
        }

        ctx.show_info(
            format!("Executing SQL query: {}", preview(sql)),
            Some("SQL Execution"),
        );
        if !params.is_empty() {
            ctx.show_info(
                format!("Parameters: {}", Value::from(params.to_vec())),
                Some("SQL Parameters"),
            );
        }

        let started = Instant::now();
        let outcome = self.executor.execute(sql, params).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(elapsed_ms, ok = outcome.is_ok(), "SQL statement executed");

        match outcome {
            Ok(outcome) => {
                self.logger
                    .log_execution(ctx, sql, outcome.to_audit_value(), elapsed_ms)
                    .await;
                let message = match &outcome {
                    SqlOutcome::Select { row_count, .. } if *row_count > 0 => format!(
                        "Query executed successfully. Found {} records",
                        row_count
                    ),
                    _ => "Query executed successfully".to_string(),
                };
                ctx.show_info(message, Some("Query Result"));
                Ok(outcome)
            }
            Err(e) => {
                let message = e.to_string();
                let result = json!({
                    "success": false,
                    "type": "error",
                    "error": message,
                });
                self.logger.log_execution(ctx, sql, result, elapsed_ms).await;
                ctx.show_error(format!("SQL execution failed: {}", message), Some("SQL Error"));
                Err(AccessError::OperationFailure { message })
            }
        }
    }
}

/// 先頭 `PREVIEW_CHARS` 文字（超える場合は "..." を付ける）
fn preview(sql: &str) -> String {
    match sql.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}
