//! `logs/*`: 監査ログの検索・集計処理

use super::parse_params;
use crate::audit::stats::{self, DEFAULT_SLOW_THRESHOLD_MS};
use crate::audit::{AuditLogger, AuditQuery, AuditRecord};
use crate::diagnostics::RequestContext;
use crate::dispatch::{Operation, OperationRegistry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// 集計系で取得する最大件数
const ANALYSIS_LIMIT: usize = 10_000;

fn default_user_limit() -> usize {
    50
}
fn default_limit() -> usize {
    100
}
fn default_hours() -> i64 {
    24
}
fn default_threshold() -> u64 {
    DEFAULT_SLOW_THRESHOLD_MS
}
fn default_slow_limit() -> usize {
    20
}
fn default_activity_days() -> i64 {
    7
}
fn default_cleanup_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
struct ByUserParams {
    user: String,
    #[serde(default = "default_user_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct TimeRangeParams {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    user: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    #[serde(default = "default_hours")]
    hours: i64,
    #[serde(default = "default_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct StatisticsParams {
    #[serde(default = "default_hours")]
    hours: i64,
}

#[derive(Debug, Deserialize)]
struct SlowParams {
    #[serde(default = "default_threshold")]
    threshold_ms: u64,
    #[serde(default = "default_slow_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct ActivityParams {
    user: String,
    #[serde(default = "default_activity_days")]
    days: i64,
}

#[derive(Debug, Deserialize)]
struct CleanupParams {
    #[serde(default = "default_cleanup_days")]
    days: i64,
}

/// ログ処理の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogsKind {
    /// 実行者で検索
    ByUser,
    /// 期間で検索
    ByTimeRange,
    /// 直近N時間
    Recent,
    /// 統計
    Statistics,
    /// スロークエリ
    SlowQueries,
    /// 実行者の活動サマリ
    UserActivity,
    /// 古いログの削除
    Cleanup,
}

impl LogsKind {
    /// すべての種類と登録名
    pub const ALL: [(LogsKind, &'static str); 7] = [
        (LogsKind::ByUser, "logs/get_logs_by_user"),
        (LogsKind::ByTimeRange, "logs/get_logs_by_time_range"),
        (LogsKind::Recent, "logs/get_recent_logs"),
        (LogsKind::Statistics, "logs/get_log_statistics"),
        (LogsKind::SlowQueries, "logs/get_slow_queries"),
        (LogsKind::UserActivity, "logs/get_user_activity_summary"),
        (LogsKind::Cleanup, "logs/cleanup_old_logs"),
    ];
}

/// 監査ログを扱う処理
pub struct LogsOperation {
    kind: LogsKind,
    logger: Arc<AuditLogger>,
}

/// `logs/*` をすべて登録する
pub fn register(registry: &mut OperationRegistry, logger: Arc<AuditLogger>) {
    for (kind, name) in LogsKind::ALL {
        registry.register(
            name,
            Arc::new(LogsOperation {
                kind,
                logger: logger.clone(),
            }),
        );
    }
}

/// 結果を整形済みJSONとしてエントリに載せる
fn show_json<T: Serialize>(
    ctx: &mut RequestContext,
    value: &T,
    title: &str,
) -> anyhow::Result<()> {
    ctx.show_info(serde_json::to_string_pretty(value)?, Some(title));
    Ok(())
}

fn report_records(
    ctx: &mut RequestContext,
    records: &[AuditRecord],
    found: String,
    empty: String,
) -> anyhow::Result<()> {
    if records.is_empty() {
        ctx.show_warning(empty, Some("Log Query Result"));
        return Ok(());
    }
    ctx.show_info(found, Some("Log Query Result"));
    show_json(ctx, &records, "Log Query Data")
}

fn hours_ago(hours: i64) -> anyhow::Result<DateTime<Utc>> {
    stats::hours_ago(hours).ok_or_else(|| anyhow::anyhow!("hours out of range: {}", hours))
}

fn days_ago(days: i64) -> anyhow::Result<DateTime<Utc>> {
    stats::days_ago(days).ok_or_else(|| anyhow::anyhow!("days out of range: {}", days))
}

impl LogsOperation {
    async fn by_user(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let p: ByUserParams = parse_params(params)?;
        ctx.show_info(format!("Querying logs for user: {}", p.user), Some("Log Query"));
        let records = self
            .logger
            .query(&AuditQuery::default().actor(&p.user).limit(p.limit))
            .await?;
        report_records(
            ctx,
            &records,
            format!("Found {} logs for user {}", records.len(), p.user),
            format!("No logs found for user {}", p.user),
        )
    }

    async fn by_time_range(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let p: TimeRangeParams = parse_params(params)?;
        let end = p.end.unwrap_or_else(Utc::now);
        ctx.show_info(
            format!("Querying logs from {} to {}", p.start.to_rfc3339(), end.to_rfc3339()),
            Some("Log Query"),
        );
        let mut query = AuditQuery::default().since(p.start).until(end).limit(p.limit);
        query.actor = p.user;
        let records = self.logger.query(&query).await?;
        report_records(
            ctx,
            &records,
            format!("Found {} logs in time range", records.len()),
            "No logs found in time range".to_string(),
        )
    }

    async fn recent(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let p: RecentParams = parse_params(params)?;
        ctx.show_info(format!("Getting logs from last {} hours", p.hours), Some("Log Query"));
        let query = AuditQuery::default()
            .since(hours_ago(p.hours)?)
            .limit(p.limit);
        let records = self.logger.query(&query).await?;
        report_records(
            ctx,
            &records,
            format!("Found {} logs in last {} hours", records.len(), p.hours),
            format!("No logs found in last {} hours", p.hours),
        )
    }

    async fn statistics(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let p: StatisticsParams = parse_params(params)?;
        ctx.show_info(
            format!("Calculating log statistics for last {} hours", p.hours),
            Some("Log Statistics"),
        );
        let query = AuditQuery::default()
            .since(hours_ago(p.hours)?)
            .limit(ANALYSIS_LIMIT);
        let records = self.logger.query(&query).await?;
        if records.is_empty() {
            ctx.show_warning("No logs found for statistics", Some("Log Statistics"));
        }
        show_json(ctx, &stats::statistics(&records), "Log Statistics")
    }

    async fn slow_queries(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let p: SlowParams = parse_params(params)?;
        ctx.show_info(
            format!("Finding slow queries (>{}ms)", p.threshold_ms),
            Some("Slow Query Analysis"),
        );
        let query = AuditQuery::default()
            .since(hours_ago(24)?)
            .limit(ANALYSIS_LIMIT);
        let records = self.logger.query(&query).await?;
        let slow = stats::slow_queries(&records, p.threshold_ms, p.limit);
        if slow.is_empty() {
            ctx.show_info("No slow queries found", Some("Slow Query Analysis"));
            return Ok(());
        }
        ctx.show_info(
            format!("Found {} slow queries", slow.len()),
            Some("Slow Query Analysis"),
        );
        show_json(ctx, &slow, "Slow Query Data")
    }

    async fn user_activity(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let p: ActivityParams = parse_params(params)?;
        ctx.show_info(
            format!(
                "Generating activity summary for user {} (last {} days)",
                p.user, p.days
            ),
            Some("User Activity"),
        );
        let query = AuditQuery::default()
            .actor(&p.user)
            .since(days_ago(p.days)?)
            .limit(ANALYSIS_LIMIT);
        let records = self.logger.query(&query).await?;
        if records.is_empty() {
            ctx.show_warning(
                format!("No activity found for user {}", p.user),
                Some("User Activity"),
            );
        }
        let summary = stats::user_activity(&records);
        if !records.is_empty() {
            ctx.show_info(
                format!(
                    "Activity summary generated: {} commands, {:.1}% error rate",
                    summary.total_commands, summary.error_rate
                ),
                Some("User Activity"),
            );
        }
        show_json(ctx, &summary, "User Activity Data")
    }

    async fn cleanup(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let p: CleanupParams = parse_params(params)?;
        ctx.show_info(
            format!("Cleaning up logs older than {} days", p.days),
            Some("Log Cleanup"),
        );
        let cutoff = days_ago(p.days)?;
        match self.logger.cleanup_before(cutoff).await {
            Ok(removed) => {
                tracing::info!(removed, days = p.days, "Old audit logs removed");
                ctx.show_info(
                    format!("Cleaned up {} old log entries", removed),
                    Some("Log Cleanup"),
                );
            }
            Err(e) => {
                ctx.show_error(
                    format!("Failed to cleanup old logs: {}", e),
                    Some("Log Cleanup Error"),
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Operation for LogsOperation {
    async fn call(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        match self.kind {
            LogsKind::ByUser => self.by_user(ctx, params).await,
            LogsKind::ByTimeRange => self.by_time_range(ctx, params).await,
            LogsKind::Recent => self.recent(ctx, params).await,
            LogsKind::Statistics => self.statistics(ctx, params).await,
            LogsKind::SlowQueries => self.slow_queries(ctx, params).await,
            LogsKind::UserActivity => self.user_activity(ctx, params).await,
            LogsKind::Cleanup => self.cleanup(ctx, params).await,
        }
    }
}
