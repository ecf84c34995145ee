//! `db/sql_query`: 読み取り専用のSQL問い合わせ

use super::parse_params;
use crate::diagnostics::RequestContext;
use crate::dispatch::Operation;
use crate::gateway::SqlGateway;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SqlQueryParams {
    sql: String,
    #[serde(default)]
    params: Vec<Value>,
}

/// SQL問い合わせ処理
///
/// 拒否・実行失敗はゲートウェイが診断エントリとして記録済みのため、
/// ここではエラーとして返さない。
pub struct SqlQuery {
    gateway: Arc<SqlGateway>,
}

impl SqlQuery {
    /// ゲートウェイを使う処理を作成
    pub fn new(gateway: Arc<SqlGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Operation for SqlQuery {
    async fn call(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()> {
        let params: SqlQueryParams = parse_params(params)?;
        if let Err(e) = self.gateway.run(ctx, &params.sql, &params.params).await {
            tracing::debug!("sql_query finished with failure: {}", e);
        }
        Ok(())
    }
}
