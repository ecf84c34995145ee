//! stats サブコマンド
//!
//! 直近の監査レコードから統計とスロークエリ件数を出力する。

use crate::audit::stats::{self, DEFAULT_SLOW_THRESHOLD_MS};
use crate::audit::{AuditLogger, AuditQuery};
use clap::Args;
use serde_json::json;
use std::io::Write;

/// stats サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Window in hours
    #[arg(long, default_value_t = 24)]
    pub hours: i64,

    /// Slow query threshold in milliseconds
    #[arg(long, default_value_t = DEFAULT_SLOW_THRESHOLD_MS)]
    pub slow_threshold_ms: u64,
}

/// Execute the stats command
pub async fn execute(
    args: &StatsArgs,
    logger: &AuditLogger,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let since = stats::hours_ago(args.hours)
        .ok_or_else(|| anyhow::anyhow!("--hours out of range: {}", args.hours))?;
    let query = AuditQuery::default().since(since).limit(10_000);
    let records = logger.query(&query).await?;

    let report = json!({
        "hours": args.hours,
        "statistics": stats::statistics(&records),
        "slow_queries": stats::slow_queries(&records, args.slow_threshold_ms, usize::MAX).len(),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
