//! 統合テスト共通ヘルパー

#![allow(dead_code)]

use std::sync::Arc;
use toolset::audit::backend::FileBackend;
use toolset::audit::AuditLogger;
use toolset::dispatch::{Dispatcher, OperationRegistry};
use toolset::gateway::{SqlGateway, SqliteExecutor};
use toolset::AppState;

/// テスト用の環境一式
pub struct TestEnv {
    /// 監査ログディレクトリ（ドロップで削除）
    pub dir: tempfile::TempDir,
    /// 問い合わせ先のプール
    pub pool: sqlx::SqlitePool,
    /// 監査ロガー
    pub logger: Arc<AuditLogger>,
    /// ゲートウェイ
    pub gateway: Arc<SqlGateway>,
}

impl TestEnv {
    /// 組み込み処理を登録したレジストリ
    pub fn builtin_registry(&self) -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        toolset::ops::register_builtin(&mut registry, self.gateway.clone(), self.logger.clone());
        registry
    }

    /// レジストリからアプリ状態を作成
    pub fn state(&self, registry: OperationRegistry) -> AppState {
        AppState {
            dispatcher: Dispatcher::new(registry),
            audit_logger: self.logger.clone(),
        }
    }

    /// 問い合わせ先テーブルの行数
    pub async fn item_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

/// JSONL監査ログ + `items` テーブル入りのインメモリSQLite
pub async fn create_env() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    for name in ["apple", "banana", "cherry"] {
        sqlx::query("INSERT INTO items (name) VALUES (?)")
            .bind(name)
            .execute(&pool)
            .await
            .unwrap();
    }

    let logger = Arc::new(AuditLogger::new(Arc::new(FileBackend::new(
        dir.path(),
        "execution_logs",
    ))));
    let gateway = Arc::new(SqlGateway::new(
        Arc::new(SqliteExecutor::new(pool.clone())),
        logger.clone(),
    ));

    TestEnv {
        dir,
        pool,
        logger,
        gateway,
    }
}
