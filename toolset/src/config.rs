//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs, and the typed settings
//! structs built from them.

use crate::common::error::{ToolsetError, ToolsetResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Arguments
/// * `new_name` - The new environment variable name (preferred)
/// * `old_name` - The deprecated environment variable name (fallback)
///
/// # Returns
/// * `Some(value)` - The environment variable value
/// * `None` - Neither variable is set
///
/// # Example
/// ```
/// use toolset::config::get_env_with_fallback;
///
/// let dir = get_env_with_fallback("TOOLSET_LOG_DIR", "LOG_FILE_DIR");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
///
/// Similar to `get_env_with_fallback`, but returns a default value
/// if neither variable is set.
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Returns `default` if neither variable is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get a boolean flag; `true/1/yes/on` (case-insensitive) enable it.
pub fn get_env_flag(new_name: &str, old_name: &str) -> bool {
    get_env_with_fallback(new_name, old_name)
        .map(|value| {
            matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

/// Audit backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditBackendKind {
    /// Append-only JSONL files, one per day
    File,
    /// Embedded relational store (SQLite)
    Sqlite,
    /// Networked relational store (MySQL)
    MySql,
}

impl FromStr for AuditBackendKind {
    type Err = ToolsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "sqlite" | "embedded-relational" => Ok(Self::Sqlite),
            "mysql" | "networked-relational" => Ok(Self::MySql),
            other => Err(ToolsetError::Config(format!(
                "unknown audit backend '{}' (expected file, sqlite or mysql)",
                other
            ))),
        }
    }
}

impl AuditBackendKind {
    /// Canonical name used in logs and `/health`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
        }
    }
}

/// Connection parameters for the networked relational backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlConfig {
    /// Host name or IP
    pub host: String,
    /// TCP port
    pub port: u16,
    /// User name
    pub user: String,
    /// Password (may be empty)
    pub password: String,
    /// Database name
    pub database: String,
}

impl MySqlConfig {
    /// Load connection parameters from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: get_env_with_fallback_or("TOOLSET_DB_HOST", "DB_IP", "127.0.0.1"),
            port: get_env_with_fallback_parse("TOOLSET_DB_PORT", "DB_PORT", 3306u16),
            user: get_env_with_fallback_or("TOOLSET_DB_USER", "DB_USER", "root"),
            password: get_env_with_fallback_or("TOOLSET_DB_PASSWORD", "DB_PASSWORD", ""),
            database: get_env_with_fallback_or("TOOLSET_DB_NAME", "DB_NAME", "execution_logs"),
        }
    }
}

/// Default cap for the serialized `result` of one audit record
pub const DEFAULT_MAX_RESULT_BYTES: usize = 64 * 1024;

/// Audit logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogConfig {
    /// Active backend
    pub backend: AuditBackendKind,
    /// Directory for the file backend
    pub log_dir: PathBuf,
    /// File name prefix for the file backend
    pub file_prefix: String,
    /// Database file for the SQLite backend
    pub sqlite_path: PathBuf,
    /// Connection parameters for the MySQL backend
    pub mysql: MySqlConfig,
    /// Results larger than this are truncated before being written
    pub max_result_bytes: usize,
    /// Write an audit record for statements rejected by the safety check
    pub audit_rejected: bool,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            backend: AuditBackendKind::File,
            log_dir: PathBuf::from("./execution_logs"),
            file_prefix: "execution_logs".to_string(),
            sqlite_path: PathBuf::from("./execution_logs.db"),
            mysql: MySqlConfig {
                host: "127.0.0.1".to_string(),
                port: 3306,
                user: "root".to_string(),
                password: String::new(),
                database: "execution_logs".to_string(),
            },
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            audit_rejected: false,
        }
    }
}

impl AuditLogConfig {
    /// Load audit configuration from environment variables.
    ///
    /// An unknown backend name is a configuration error; every other value
    /// falls back to its default.
    pub fn from_env() -> ToolsetResult<Self> {
        let backend = get_env_with_fallback_or("TOOLSET_LOG_BACKEND", "LOG_TYPE", "file")
            .parse::<AuditBackendKind>()?;

        Ok(Self {
            backend,
            log_dir: PathBuf::from(get_env_with_fallback_or(
                "TOOLSET_LOG_DIR",
                "LOG_FILE_DIR",
                "./execution_logs",
            )),
            file_prefix: get_env_with_fallback_or(
                "TOOLSET_LOG_FILE_PREFIX",
                "LOG_FILE_PREFIX",
                "execution_logs",
            ),
            sqlite_path: PathBuf::from(get_env_with_fallback_or(
                "TOOLSET_SQLITE_PATH",
                "SQLITE_FILE_PATH",
                "./execution_logs.db",
            )),
            mysql: MySqlConfig::from_env(),
            max_result_bytes: get_env_with_fallback_parse(
                "TOOLSET_MAX_RESULT_BYTES",
                "MAX_RESULT_BYTES",
                DEFAULT_MAX_RESULT_BYTES,
            ),
            audit_rejected: get_env_flag("TOOLSET_AUDIT_REJECTED", "AUDIT_REJECTED"),
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level directive when `RUST_LOG` is unset
    pub level: String,
    /// Force debug level (SQL tracing)
    pub sql_debug: bool,
    /// Directory for the daily-rolling application log, if any
    pub app_log_dir: Option<PathBuf>,
}

impl LoggingConfig {
    /// Load logging configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            level: get_env_with_fallback_or("TOOLSET_LOG_LEVEL", "LOG_LEVEL", "info")
                .to_ascii_lowercase(),
            sql_debug: get_env_flag("TOOLSET_SQL_DEBUG", "ENABLE_SQL_DEBUG"),
            app_log_dir: get_env_with_fallback("TOOLSET_APP_LOG_DIR", "APP_LOG_DIR")
                .map(PathBuf::from),
        }
    }

    /// Effective level directive
    pub fn effective_level(&self) -> &str {
        if self.sql_debug {
            "debug"
        } else {
            &self.level
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
}

impl ServerConfig {
    /// Load server configuration from environment variables.
    pub fn from_env() -> Self {
        let host = get_env_with_fallback_or("TOOLSET_HOST", "HOST", "0.0.0.0");
        let port = get_env_with_fallback_parse("TOOLSET_PORT", "PORT", 8000u16);
        Self { host, port }
    }

    /// `host:port` for `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database file queried by the `db/sql_query` operation
///
/// 環境変数 `TOOLSET_CACHE_DB`（旧: `CACHE_DB_PATH`）から取得し、
/// 未設定の場合は `./cache.db` を返す。
pub fn get_cache_db_path() -> PathBuf {
    PathBuf::from(get_env_with_fallback_or(
        "TOOLSET_CACHE_DB",
        "CACHE_DB_PATH",
        "./cache.db",
    ))
}
