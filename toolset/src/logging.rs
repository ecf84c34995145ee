//! ロギング初期化ユーティリティ
//!
//! `tracing-subscriber` のレジストリに標準エラー出力レイヤーと
//! （設定されていれば）日次ローテーションのファイルレイヤーを登録する。
//! 標準出力はCLIの結果出力専用とする。

use crate::common::error::{ToolsetError, ToolsetResult};
use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// アプリケーションログのファイル名プレフィックス
const APP_LOG_FILE: &str = "toolset.log";

/// 環境変数から設定を読み込んでロギングを初期化
///
/// ファイル出力が有効な場合は `WorkerGuard` を返す。
/// プロセス終了までドロップしないこと（未フラッシュのログが失われる）。
pub fn init() -> ToolsetResult<Option<WorkerGuard>> {
    init_with(&LoggingConfig::from_env())
}

/// 指定した設定でロギングを初期化
pub fn init_with(config: &LoggingConfig) -> ToolsetResult<Option<WorkerGuard>> {
    let filter = build_filter(config);

    let (file_layer, guard) = match &config.app_log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, APP_LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| ToolsetError::Internal(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

/// `RUST_LOG` を優先し、未設定なら設定値のレベルを使うフィルタを構築
///
/// SQLデバッグが有効な場合は常に `debug` になる。
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if config.sql_debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(config.effective_level()).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}
