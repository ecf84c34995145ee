//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::ToolsetError;
use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub ToolsetError);

impl From<ToolsetError> for AppError {
    fn from(err: ToolsetError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // 詳細はログのみに出し、レスポンスには external_message() を使う
        tracing::warn!("API error: {}", self.0);
        let payload = json!({
            "error": self.0.external_message()
        });
        (self.0.status_code(), Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let res = AppError(ToolsetError::Validation("limit must be positive".to_string()))
            .into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(res.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Invalid request");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let res = AppError(ToolsetError::Database(
            "mysql://root:secret@db:3306".to_string(),
        ))
        .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(res.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret"));
    }
}
