//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! `ToolsetError`は`external_message()`と`status_code()`を提供し、
//! HTTP層が内部詳細を漏らさずにレスポンスを組み立てられるようにする。

use axum::http::StatusCode;
use thiserror::Error;

/// toolset error type
#[derive(Debug, Error)]
pub enum ToolsetError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error (file backend, log directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (bad request parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolsetError {
    /// Returns a safe error message for external clients.
    ///
    /// Use the `Display` implementation for server logs; it carries the full detail
    /// (file paths, connection strings) that must not reach HTTP responses.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration error",
            Self::Database(_) => "Database error",
            Self::Io(_) => "Storage error",
            Self::Serialization(_) => "Request error",
            Self::NotFound(_) => "Not found",
            Self::Validation(_) => "Invalid request",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Serialization(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias
pub type ToolsetResult<T> = Result<T, ToolsetError>;
