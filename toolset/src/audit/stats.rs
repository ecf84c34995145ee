//! 監査ログの集計
//!
//! バックエンドから取得したレコード列に対する純粋な集計関数。

use super::types::AuditRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// スロークエリ判定のデフォルト閾値（ミリ秒）
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 1000;

/// ログ統計
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStatistics {
    /// 総件数
    pub total_logs: usize,
    /// 実行者の種類数
    pub unique_users: usize,
    /// 平均実行時間（ミリ秒、小数2桁）
    pub avg_execution_time: f64,
    /// 失敗件数
    pub error_count: usize,
    /// 成功件数
    pub success_count: usize,
    /// 失敗率（%、小数2桁）
    pub error_rate: f64,
}

/// 実行者ごとの活動サマリ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserActivitySummary {
    /// 実行コマンド数
    pub total_commands: usize,
    /// 平均実行時間（ミリ秒、小数2桁）
    pub avg_execution_time: f64,
    /// 失敗率（%、小数2桁）
    pub error_rate: f64,
    /// よく使われたコマンド（先頭語を大文字化、最大5件）
    pub most_used_commands: Vec<(String, usize)>,
    /// 日別件数（YYYY-MM-DD）
    pub activity_by_day: BTreeMap<String, usize>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average_time(records: &[AuditRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let total: u64 = records.iter().map(|r| r.time_cost_ms).sum();
    round2(total as f64 / records.len() as f64)
}

/// 現在から `hours` 時間前の時刻（表現できない値は `None`）
pub fn hours_ago(hours: i64) -> Option<DateTime<Utc>> {
    Duration::try_hours(hours).and_then(|d| Utc::now().checked_sub_signed(d))
}

/// 現在から `days` 日前の時刻（表現できない値は `None`）
pub fn days_ago(days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| Utc::now().checked_sub_signed(d))
}

/// レコード列の統計を計算
pub fn statistics(records: &[AuditRecord]) -> LogStatistics {
    if records.is_empty() {
        return LogStatistics::default();
    }

    let unique_users: HashSet<&str> = records.iter().map(|r| r.actor.as_str()).collect();
    let error_count = records.iter().filter(|r| r.is_error()).count();
    let total = records.len();

    LogStatistics {
        total_logs: total,
        unique_users: unique_users.len(),
        avg_execution_time: average_time(records),
        error_count,
        success_count: total - error_count,
        error_rate: round2(error_count as f64 / total as f64 * 100.0),
    }
}

/// 閾値を超えたレコードを遅い順に最大 `limit` 件返す
pub fn slow_queries(records: &[AuditRecord], threshold_ms: u64, limit: usize) -> Vec<AuditRecord> {
    let mut slow: Vec<AuditRecord> = records
        .iter()
        .filter(|r| r.time_cost_ms > threshold_ms)
        .cloned()
        .collect();
    slow.sort_by(|a, b| b.time_cost_ms.cmp(&a.time_cost_ms));
    slow.truncate(limit);
    slow
}

/// 1人分のレコード列から活動サマリを作成
pub fn user_activity(records: &[AuditRecord]) -> UserActivitySummary {
    if records.is_empty() {
        return UserActivitySummary::default();
    }

    let mut usage: HashMap<String, usize> = HashMap::new();
    let mut by_day: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        let verb = record
            .command
            .split_whitespace()
            .next()
            .map(|w| w.to_uppercase())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        *usage.entry(verb).or_insert(0) += 1;
        *by_day
            .entry(record.timestamp.format("%Y-%m-%d").to_string())
            .or_insert(0) += 1;
    }

    let mut most_used: Vec<(String, usize)> = usage.into_iter().collect();
    most_used.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_used.truncate(5);

    let error_count = records.iter().filter(|r| r.is_error()).count();

    UserActivitySummary {
        total_commands: records.len(),
        avg_execution_time: average_time(records),
        error_rate: round2(error_count as f64 / records.len() as f64 * 100.0),
        most_used_commands: most_used,
        activity_by_day: by_day,
    }
}
