//! toolset
//!
//! リクエスト単位の診断バッファと、監査付きの読み取り専用データアクセス

#![warn(missing_docs)]

/// 共通型定義（エラー型）
pub mod common;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// ロギング初期化ユーティリティ
pub mod logging;

/// リクエストコンテキストと診断バッファ
pub mod diagnostics;

/// 監査ログシステム
pub mod audit;

/// SQL安全判定
pub mod guard;

/// データアクセスラッパー
pub mod gateway;

/// ディスパッチ境界
pub mod dispatch;

/// 組み込みの業務処理
pub mod ops;

/// REST APIハンドラー
pub mod api;

/// HTTPサーバー
pub mod server;

/// CLIインターフェース
pub mod cli;

use std::sync::Arc;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// 業務処理のディスパッチャ
    pub dispatcher: dispatch::Dispatcher,
    /// 監査ロガー（参照API・ヘルスチェック用）
    pub audit_logger: Arc<audit::AuditLogger>,
}
