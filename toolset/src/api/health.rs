//! ヘルスチェックAPI

use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// ヘルスチェックレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 常に "ok"
    pub status: String,
    /// バージョン
    pub version: String,
    /// 監査ログバックエンド名
    pub audit_backend: String,
    /// 監査ログ書き込み失敗の累計
    pub failed_audit_writes: u64,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        audit_backend: state.audit_logger.backend().name().to_string(),
        failed_audit_writes: state.audit_logger.failed_writes(),
    })
}
