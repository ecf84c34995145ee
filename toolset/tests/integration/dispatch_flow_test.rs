//! ディスパッチ境界からデータアクセス・監査までの通し試験

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use toolset::audit::AuditQuery;
use toolset::diagnostics::RequestContext;
use toolset::dispatch::{Dispatcher, Operation, Outcome};

/// 2回問い合わせ、間で他タスクに実行を譲る処理
struct TwoQueries {
    gateway: Arc<toolset::gateway::SqlGateway>,
}

#[async_trait]
impl Operation for TwoQueries {
    async fn call(&self, ctx: &mut RequestContext, _params: Value) -> anyhow::Result<()> {
        let _ = self.gateway.run(ctx, "SELECT name FROM items", &[]).await;
        tokio::task::yield_now().await;
        let _ = self
            .gateway
            .run(ctx, "SELECT COUNT(*) AS n FROM items", &[])
            .await;
        ctx.show_info(format!("done by {}", ctx.actor()), None);
        Ok(())
    }
}

/// 開始メッセージの後に書き込み文を送る処理
struct StartThenInsert {
    gateway: Arc<toolset::gateway::SqlGateway>,
}

#[async_trait]
impl Operation for StartThenInsert {
    async fn call(&self, ctx: &mut RequestContext, _params: Value) -> anyhow::Result<()> {
        ctx.show_info("start", None);
        let _ = self
            .gateway
            .run(ctx, "INSERT INTO items VALUES (9, 'x')", &[])
            .await;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_do_not_share_context() {
    let env = crate::support::create_env().await;
    let mut registry = env.builtin_registry();
    registry.register(
        "test/two_queries",
        Arc::new(TwoQueries {
            gateway: env.gateway.clone(),
        }),
    );
    let dispatcher = Dispatcher::new(registry);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            let actor = format!("user-{}", i);
            let result = dispatcher
                .dispatch("test/two_queries", Some(&actor), Value::Null)
                .await;
            (actor, result)
        }));
    }

    for task in tasks {
        let (actor, result) = task.await.unwrap();
        assert_eq!(result.outcome, Outcome::Succeeded);
        let envelope = result.envelope;
        assert!(envelope.status);
        assert_eq!(envelope.execution_logs.len(), 2);
        assert!(envelope.execution_logs.iter().all(|r| r.actor == actor));
        assert_eq!(
            envelope.output.last().unwrap().content,
            format!("done by {}", actor)
        );
    }

    let records = env
        .logger
        .query(&AuditQuery::default().limit(1000))
        .await
        .unwrap();
    assert_eq!(records.len(), 32);
    for i in 0..16 {
        let actor = format!("user-{}", i);
        assert_eq!(records.iter().filter(|r| r.actor == actor).count(), 2);
    }
}

#[tokio::test]
async fn denied_statement_leaves_store_and_audit_untouched() {
    let env = crate::support::create_env().await;
    let dispatcher = Dispatcher::new(env.builtin_registry());

    let result = dispatcher
        .dispatch(
            "db/sql_query",
            Some("mallory"),
            json!({"sql": "SELECT * FROM items; DELETE FROM items"}),
        )
        .await;

    let envelope = result.envelope;
    assert!(!envelope.status);
    assert_eq!(envelope.error, "delete");
    assert_eq!(envelope.output.len(), 1);
    assert_eq!(envelope.output[0].title, "SQL Security Check");
    assert!(envelope.execution_logs.is_empty());

    assert_eq!(env.item_count().await, 3);
    assert!(env
        .logger
        .query(&AuditQuery::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn denied_write_after_info_keeps_both_entries() {
    let env = crate::support::create_env().await;
    let mut registry = env.builtin_registry();
    registry.register(
        "test/start_then_insert",
        Arc::new(StartThenInsert {
            gateway: env.gateway.clone(),
        }),
    );
    let dispatcher = Dispatcher::new(registry);

    let result = dispatcher
        .dispatch("test/start_then_insert", Some("mallory"), Value::Null)
        .await;

    assert_eq!(result.outcome, Outcome::Succeeded);
    let envelope = result.envelope;
    assert!(!envelope.status);
    assert_eq!(envelope.output.len(), 2);
    assert_eq!(envelope.output[0].content, "start");
    assert_eq!(envelope.output[1].title, "SQL Security Check");
    assert_eq!(envelope.error, "insert");
    assert!(envelope.execution_logs.is_empty());

    assert_eq!(env.item_count().await, 3);
    assert!(env
        .logger
        .query(&AuditQuery::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn comment_hidden_drop_is_denied_and_table_survives() {
    let env = crate::support::create_env().await;
    let dispatcher = Dispatcher::new(env.builtin_registry());

    let result = dispatcher
        .dispatch(
            "db/sql_query",
            Some("mallory"),
            json!({"sql": "SELECT 1 -- /*\n; DROP TABLE items; -- */"}),
        )
        .await;

    let envelope = result.envelope;
    assert!(!envelope.status);
    assert_eq!(envelope.error, "drop");
    assert!(envelope.execution_logs.is_empty());
    assert_eq!(env.item_count().await, 3);
}

#[tokio::test]
async fn store_failure_is_audited() {
    let env = crate::support::create_env().await;
    let dispatcher = Dispatcher::new(env.builtin_registry());

    let result = dispatcher
        .dispatch(
            "db/sql_query",
            Some("alice"),
            json!({"sql": "SELECT * FROM missing_table"}),
        )
        .await;

    assert_eq!(result.outcome, Outcome::Succeeded);
    let envelope = result.envelope;
    assert!(!envelope.status);
    assert!(envelope.error.contains("missing_table"));

    let records = env.logger.query(&AuditQuery::default()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].actor, "alice");
    assert!(records[0].is_error());
}

#[tokio::test]
async fn audit_records_feed_log_operations() {
    let env = crate::support::create_env().await;
    let dispatcher = Dispatcher::new(env.builtin_registry());

    for actor in ["alice", "alice", "bob"] {
        let result = dispatcher
            .dispatch(
                "db/sql_query",
                Some(actor),
                json!({"sql": "SELECT name FROM items WHERE id = ?", "params": [1]}),
            )
            .await;
        assert!(result.envelope.status);
    }

    let result = dispatcher
        .dispatch("logs/get_logs_by_user", None, json!({"user": "alice"}))
        .await;
    assert!(result.envelope.status);
    assert_eq!(
        result.envelope.output[1].content,
        "Found 2 logs for user alice"
    );

    let result = dispatcher
        .dispatch("logs/get_log_statistics", None, Value::Null)
        .await;
    let stats: Value =
        serde_json::from_str(&result.envelope.output.last().unwrap().content).unwrap();
    assert_eq!(stats["total_logs"], 3);
    assert_eq!(stats["unique_users"], 2);
    assert_eq!(stats["error_count"], 0);
}
