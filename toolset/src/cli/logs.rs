//! logs サブコマンド
//!
//! 設定されたバックエンドから監査レコードを検索し、JSON Lines で出力する。

use crate::audit::types::DEFAULT_QUERY_LIMIT;
use crate::audit::{AuditLogger, AuditQuery};
use chrono::{DateTime, Utc};
use clap::Args;
use std::io::Write;

/// logs サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Only records by this actor
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only records at or after this time (RFC 3339)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Only records at or before this time (RFC 3339)
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,

    /// Maximum number of records
    #[arg(short, long, default_value_t = DEFAULT_QUERY_LIMIT)]
    pub limit: usize,
}

impl From<&LogsArgs> for AuditQuery {
    fn from(args: &LogsArgs) -> Self {
        Self {
            actor: args.user.clone(),
            start: args.since,
            end: args.until,
            limit: args.limit,
        }
    }
}

/// Execute the logs command
pub async fn execute(
    args: &LogsArgs,
    logger: &AuditLogger,
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    let records = logger.query(&AuditQuery::from(args)).await?;
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    Ok(records.len())
}
