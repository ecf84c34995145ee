//! axumサーバー起動・シャットダウンハンドリング

use crate::common::error::{ToolsetError, ToolsetResult};
use crate::AppState;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// axumサーバーを起動し、OSのシャットダウンシグナルを待機する
pub async fn run(state: AppState, bind_addr: &str) -> ToolsetResult<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| ToolsetError::Config(format!("Failed to bind to {}: {}", bind_addr, e)))?;

    info!("toolset server listening on {}", bind_addr);
    serve(listener, state, shutdown_signal()).await
}

/// バインド済みのリスナーで `signal` が完了するまで処理する
pub async fn serve<F>(listener: TcpListener, state: AppState, signal: F) -> ToolsetResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = crate::api::create_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| ToolsetError::Internal(format!("Server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}

/// シャットダウンシグナルを待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
