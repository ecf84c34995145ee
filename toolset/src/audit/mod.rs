//! 監査ログシステム
//!
//! 実行されたコマンドを実行者・所要時間・結果とともに記録する。
//! 書き込みはベストエフォートで、失敗しても業務処理を失敗させない。

/// 監査ログの型定義
pub mod types;

/// バックエンド（JSONLファイル / SQLite / MySQL）
pub mod backend;

/// 監査ロガー
pub mod logger;

/// ログ集計（統計・スロークエリ・活動サマリ）
pub mod stats;

pub use logger::AuditLogger;
pub use types::{AuditQuery, AuditRecord};
