//! 監査ログAPIハンドラー
//!
//! `/api/audit-logs` 系のエンドポイント

use super::error::AppError;
use crate::audit::stats::{self, LogStatistics};
use crate::audit::types::DEFAULT_QUERY_LIMIT;
use crate::audit::{AuditQuery, AuditRecord};
use crate::common::error::ToolsetError;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一覧取得の上限件数
const MAX_LIST_LIMIT: usize = 10_000;

/// 監査ログ一覧取得のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQueryParams {
    /// 実行者でフィルタ
    pub user: Option<String>,
    /// 開始日時
    pub start: Option<DateTime<Utc>>,
    /// 終了日時
    pub end: Option<DateTime<Utc>>,
    /// 最大件数（デフォルト: 100）
    pub limit: Option<usize>,
}

impl TryFrom<AuditLogQueryParams> for AuditQuery {
    type Error = ToolsetError;

    fn try_from(params: AuditLogQueryParams) -> Result<Self, Self::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(ToolsetError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIST_LIMIT
            )));
        }
        if let (Some(start), Some(end)) = (params.start, params.end) {
            if start > end {
                return Err(ToolsetError::Validation(
                    "start must not be after end".to_string(),
                ));
            }
        }
        Ok(Self {
            actor: params.user,
            start: params.start,
            end: params.end,
            limit,
        })
    }
}

/// 監査ログ一覧レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogListResponse {
    /// 新しい順のレコード
    pub items: Vec<AuditRecord>,
    /// 返却件数
    pub total: usize,
}

/// 統計取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct AuditLogStatsParams {
    /// 集計対象の時間数（デフォルト: 24）
    pub hours: Option<i64>,
}

/// GET /api/audit-logs - 監査ログ一覧取得
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(params): Query<AuditLogQueryParams>,
) -> Result<Json<AuditLogListResponse>, AppError> {
    let query = AuditQuery::try_from(params)?;
    let items = state.audit_logger.query(&query).await?;
    Ok(Json(AuditLogListResponse {
        total: items.len(),
        items,
    }))
}

/// GET /api/audit-logs/stats - 監査ログ統計取得
pub async fn get_audit_log_stats(
    State(state): State<AppState>,
    Query(params): Query<AuditLogStatsParams>,
) -> Result<Json<LogStatistics>, AppError> {
    let hours = params.hours.unwrap_or(24);
    if hours <= 0 {
        return Err(ToolsetError::Validation("hours must be positive".to_string()).into());
    }
    let since = stats::hours_ago(hours)
        .ok_or_else(|| ToolsetError::Validation(format!("hours out of range: {}", hours)))?;
    let query = AuditQuery::default().since(since).limit(MAX_LIST_LIMIT);
    let records = state.audit_logger.query(&query).await?;
    Ok(Json(stats::statistics(&records)))
}
