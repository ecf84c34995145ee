//! REST APIハンドラー
//!
//! 業務処理の呼び出し、監査ログ参照、ヘルスチェック

/// 監査ログ参照
pub mod audit_log;
/// エラーレスポンス
pub mod error;
/// ヘルスチェック
pub mod health;
/// 業務処理の呼び出し
pub mod operations;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// APIルーターを作成
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/apis/{*operation}", post(operations::invoke_operation))
        .route("/api/operations", get(operations::list_operations))
        .route("/api/audit-logs", get(audit_log::list_audit_logs))
        .route("/api/audit-logs/stats", get(audit_log::get_audit_log_stats))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
