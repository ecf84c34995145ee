//! 業務処理の呼び出しAPI
//!
//! `POST /apis/{module}/{function}` を `Dispatcher` に渡し、エンベロープをそのまま返す。

use super::error::AppError;
use crate::common::error::ToolsetError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// 実行者を指定するヘッダー
pub const ACTOR_HEADER: &str = "x-actor";

/// ヘッダーから実行者を取り出す（空文字は未指定扱い）
fn actor_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// リクエストボディをパラメータとして読む（空ボディは `null`）
fn parse_body(body: &[u8]) -> Result<Value, ToolsetError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| ToolsetError::Validation(format!("Invalid JSON body: {}", e)))
}

/// POST /apis/{*operation} - 業務処理を実行
pub async fn invoke_operation(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let params = parse_body(&body)?;
    let actor = actor_from_headers(&headers);

    let dispatched = state
        .dispatcher
        .dispatch(&operation, actor.as_deref(), params)
        .await;

    Ok((dispatched.status_code(), Json(dispatched.envelope)).into_response())
}

/// GET /api/operations - 登録済み処理の一覧
pub async fn list_operations(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "operations": state.dispatcher.registry().names(),
    }))
}
