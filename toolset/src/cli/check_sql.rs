//! check-sql サブコマンド
//!
//! 安全判定だけを行い、結果を表示する（ストアには接続しない）。

use crate::guard;
use clap::Args;
use std::io::Write;

/// check-sql サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct CheckSqlArgs {
    /// Statement to classify
    pub sql: String,
}

/// 判定結果を出力し、許可されたかどうかを返す
pub fn execute(args: &CheckSqlArgs, out: &mut impl Write) -> anyhow::Result<bool> {
    let decision = guard::classify(&args.sql);
    let label = if decision.allowed { "allowed" } else { "denied" };
    writeln!(out, "{}: {}", label, decision.reason)?;
    Ok(decision.allowed)
}
