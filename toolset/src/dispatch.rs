//! ディスパッチ境界
//!
//! 1リクエストの処理を `Idle → Running → (Succeeded | Failed) → Reported` の順に進める。
//! 業務処理から漏れたエラーやパニックはここで診断エントリに変換され、
//! どんな場合でも整形済みの `Envelope` が返る。

use crate::diagnostics::{Envelope, RequestContext};
use async_trait::async_trait;
use axum::http::StatusCode;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// 登録可能な業務処理
#[async_trait]
pub trait Operation: Send + Sync {
    /// 処理を実行する。結果はコンテキストの診断バッファへ書き込む。
    async fn call(&self, ctx: &mut RequestContext, params: Value) -> anyhow::Result<()>;
}

/// 処理名（`module/function`）から業務処理への対応表
#[derive(Default, Clone)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 処理を登録する（同名があれば置き換える）
    pub fn register(&mut self, name: impl Into<String>, operation: Arc<dyn Operation>) {
        self.operations.insert(name.into(), operation);
    }

    /// 処理を取得
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    /// 登録済みの処理名（ソート済み）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }
}

/// ディスパッチの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// 開始前
    Idle,
    /// 業務処理を実行中
    Running,
    /// 正常終了
    Succeeded,
    /// 失敗（エラー・パニック・未登録）
    Failed,
    /// エンベロープを返却済み
    Reported,
}

impl DispatchState {
    /// 遷移が許されるかどうか
    pub fn can_transition_to(self, next: DispatchState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Failed)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
                | (Self::Succeeded, Self::Reported)
                | (Self::Failed, Self::Reported)
        )
    }

    fn advance(&mut self, next: DispatchState) {
        debug_assert!(
            self.can_transition_to(next),
            "invalid dispatch transition {:?} -> {:?}",
            self,
            next
        );
        tracing::trace!(from = ?self, to = ?next, "dispatch state");
        *self = next;
    }
}

/// ディスパッチ結果の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 業務処理が正常に戻った
    Succeeded,
    /// 業務処理がエラーを返した、またはパニックした
    Failed,
    /// 処理名が登録されていない
    UnknownOperation,
}

/// 1リクエストの結果
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// 結果種別
    pub outcome: Outcome,
    /// 返却するエンベロープ
    pub envelope: Envelope,
}

impl Dispatched {
    /// トランスポート層が使うステータスコード
    pub fn status_code(&self) -> StatusCode {
        match self.outcome {
            Outcome::Succeeded => StatusCode::OK,
            Outcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
            Outcome::UnknownOperation => StatusCode::NOT_FOUND,
        }
    }
}

/// ディスパッチ境界
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
}

impl Dispatcher {
    /// レジストリからディスパッチャを作成
    pub fn new(registry: OperationRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// 登録済みのレジストリ
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// 処理を1回実行してエンベロープを返す
    pub async fn dispatch(&self, name: &str, actor: Option<&str>, params: Value) -> Dispatched {
        let mut ctx = RequestContext::new();
        if let Some(actor) = actor {
            ctx.set_current_actor(actor);
        }

        let span = tracing::info_span!(
            "dispatch",
            request_id = %ctx.request_id(),
            operation = %name,
            actor = %ctx.actor(),
        );

        self.run(ctx, name, params).instrument(span).await
    }

    async fn run(&self, mut ctx: RequestContext, name: &str, params: Value) -> Dispatched {
        let mut state = DispatchState::Idle;
        ctx.reset();

        let outcome = match self.registry.get(name) {
            None => {
                state.advance(DispatchState::Failed);
                tracing::warn!("Unknown operation requested");
                ctx.show_error(format!("Unknown operation: {}", name), Some(name));
                Outcome::UnknownOperation
            }
            Some(operation) => {
                state.advance(DispatchState::Running);
                let result = AssertUnwindSafe(operation.call(&mut ctx, params))
                    .catch_unwind()
                    .await;

                match result {
                    Ok(Ok(())) => {
                        state.advance(DispatchState::Succeeded);
                        Outcome::Succeeded
                    }
                    Ok(Err(e)) => {
                        state.advance(DispatchState::Failed);
                        tracing::warn!("Operation failed: {:#}", e);
                        ctx.show_error(format!("{:#}", e), Some(name));
                        Outcome::Failed
                    }
                    Err(panic) => {
                        state.advance(DispatchState::Failed);
                        let message = panic_message(panic.as_ref());
                        tracing::error!("Operation panicked: {}", message);
                        ctx.show_error(message, Some(name));
                        Outcome::Failed
                    }
                }
            }
        };

        let envelope = ctx.snapshot();
        state.advance(DispatchState::Reported);
        tracing::info!(
            status = envelope.status,
            entries = envelope.output.len(),
            "Dispatch completed"
        );

        Dispatched { outcome, envelope }
    }
}

/// パニックのペイロードから文字列を取り出す
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: unknown payload".to_string()
    }
}
