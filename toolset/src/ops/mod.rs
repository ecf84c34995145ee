//! 組み込みの業務処理
//!
//! `db/*` はデータアクセスラッパー経由のSQL問い合わせ、
//! `logs/*` は監査ログの検索と集計を提供する。

/// SQL問い合わせ
pub mod db;

/// 監査ログの検索・集計
pub mod logs;

use crate::audit::AuditLogger;
use crate::dispatch::OperationRegistry;
use crate::gateway::SqlGateway;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// 組み込み処理をすべて登録する
pub fn register_builtin(
    registry: &mut OperationRegistry,
    gateway: Arc<SqlGateway>,
    logger: Arc<AuditLogger>,
) {
    registry.register("db/sql_query", Arc::new(db::SqlQuery::new(gateway)));
    logs::register(registry, logger);
}

/// リクエストパラメータを読み取る（`null` は全項目デフォルト扱い）
pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> anyhow::Result<T> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(params).context("invalid parameters")
}
