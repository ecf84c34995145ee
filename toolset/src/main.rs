//! toolset エントリーポイント

use clap::Parser;
use std::sync::Arc;
use toolset::audit::AuditLogger;
use toolset::cli::{Cli, Commands};
use toolset::config::{self, AuditLogConfig, ServerConfig};
use toolset::dispatch::{Dispatcher, OperationRegistry};
use toolset::gateway::{SqlGateway, SqliteExecutor};
use toolset::{logging, AppState};
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::CheckSql(args)) => {
            match toolset::cli::check_sql::execute(&args, &mut std::io::stdout()) {
                Ok(true) => Ok(()),
                Ok(false) => std::process::exit(1),
                Err(e) => Err(e),
            }
        }
        Some(Commands::Logs(args)) => match build_logger().await {
            Ok(logger) => toolset::cli::logs::execute(&args, &logger, &mut std::io::stdout())
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        },
        Some(Commands::Stats(args)) => match build_logger().await {
            Ok(logger) => {
                toolset::cli::stats::execute(&args, &logger, &mut std::io::stdout()).await
            }
            Err(e) => Err(e),
        },
        Some(Commands::Serve(args)) => run_server(args.into()).await,
        None => run_server(ServerConfig::from_env()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// 環境変数の設定から監査ロガーを作成
async fn build_logger() -> anyhow::Result<AuditLogger> {
    let audit_config = AuditLogConfig::from_env()?;
    Ok(AuditLogger::from_config(&audit_config).await?)
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    info!("toolset v{}", env!("CARGO_PKG_VERSION"));

    let audit_config = AuditLogConfig::from_env()?;
    let audit_logger = Arc::new(AuditLogger::from_config(&audit_config).await?);
    info!(
        backend = audit_logger.backend().name(),
        audit_rejected = audit_config.audit_rejected,
        "Audit logger initialized"
    );

    let cache_db = config::get_cache_db_path();
    let executor = SqliteExecutor::open(&cache_db).await?;
    info!("Query database: {}", cache_db.display());

    let gateway = Arc::new(
        SqlGateway::new(Arc::new(executor), audit_logger.clone())
            .with_audit_rejected(audit_config.audit_rejected),
    );

    let mut registry = OperationRegistry::new();
    toolset::ops::register_builtin(&mut registry, gateway, audit_logger.clone());
    info!("Registered operations: {}", registry.names().join(", "));

    let state = AppState {
        dispatcher: Dispatcher::new(registry),
        audit_logger,
    };

    toolset::server::run(state, &config.bind_addr()).await?;
    Ok(())
}
