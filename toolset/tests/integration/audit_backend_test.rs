//! 監査ログバックエンドの共通契約
//!
//! 同じ操作列をJSONL・SQLite・MySQLに流し、同じ結果になることを確認する。

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use toolset::audit::backend::{self, AuditBackend, MySqlBackend};
use toolset::audit::{AuditQuery, AuditRecord};
use toolset::config::{AuditBackendKind, AuditLogConfig};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

fn record(actor: &str, command: &str, offset_hours: i64, ms: u64) -> AuditRecord {
    let mut record = AuditRecord::new(
        actor,
        command,
        json!({"success": true, "type": "select", "row_count": 1}),
        ms,
    );
    record.timestamp = base_time() + Duration::hours(offset_hours);
    record
}

fn config(kind: AuditBackendKind, dir: &std::path::Path) -> AuditLogConfig {
    AuditLogConfig {
        backend: kind,
        log_dir: dir.join("jsonl"),
        sqlite_path: dir.join("audit/execution_logs.db"),
        ..AuditLogConfig::default()
    }
}

/// バックエンドに依存しない検証
async fn exercise(backend: Arc<dyn AuditBackend>) {
    let fixtures = [
        record("alice", "SELECT 1", -72, 5),
        record("bob", "SELECT 2", -30, 15),
        record("alice", "SELECT 3", -2, 25),
        record("alice", "SELECT 4", 0, 35),
    ];
    for fixture in &fixtures {
        assert!(backend.write(fixture).await, "{} write failed", backend.name());
    }

    let all = backend.query(&AuditQuery::default()).await.unwrap();
    let commands: Vec<_> = all.iter().map(|r| r.command.as_str()).collect();
    assert_eq!(commands, vec!["SELECT 4", "SELECT 3", "SELECT 2", "SELECT 1"]);
    assert_eq!(all[0].timestamp, fixtures[3].timestamp);
    assert_eq!(all[0].result, fixtures[3].result);
    assert_eq!(all[0].command_type, "sql");

    let alice = backend
        .query(&AuditQuery::default().actor("alice").limit(2))
        .await
        .unwrap();
    assert_eq!(alice.len(), 2);
    assert!(alice.iter().all(|r| r.actor == "alice"));

    let window = backend
        .query(
            &AuditQuery::default()
                .since(base_time() - Duration::hours(31))
                .until(base_time() - Duration::hours(1)),
        )
        .await
        .unwrap();
    let commands: Vec<_> = window.iter().map(|r| r.command.as_str()).collect();
    assert_eq!(commands, vec!["SELECT 3", "SELECT 2"]);

    // 日付単位で削除するJSONLと揃えるため、日の境界で切る
    let cutoff = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
    let removed = backend.cleanup_before(cutoff).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(backend.query(&AuditQuery::default()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn file_backend_contract() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend::from_config(&config(AuditBackendKind::File, dir.path()))
        .await
        .unwrap();
    assert_eq!(backend.name(), "file");
    exercise(backend).await;
}

#[tokio::test]
async fn sqlite_backend_contract() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend::from_config(&config(AuditBackendKind::Sqlite, dir.path()))
        .await
        .unwrap();
    assert_eq!(backend.name(), "sqlite");
    exercise(backend).await;
    assert!(dir.path().join("audit/execution_logs.db").exists());
}

#[tokio::test]
async fn mysql_backend_contract() {
    let Ok(url) = std::env::var("TOOLSET_TEST_MYSQL_URL") else {
        eprintln!("TOOLSET_TEST_MYSQL_URL not set; skipping");
        return;
    };
    let pool = sqlx::MySqlPool::connect(&url).await.unwrap();
    sqlx::query("DROP TABLE IF EXISTS execution_logs")
        .execute(&pool)
        .await
        .unwrap();
    let backend = MySqlBackend::new(pool).await.unwrap();
    exercise(Arc::new(backend)).await;
}

#[tokio::test]
async fn unwritable_file_backend_reports_false() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let backend = backend::FileBackend::new(&blocker, "execution_logs");
    assert!(!backend.write(&record("alice", "SELECT 1", 0, 1)).await);
}
