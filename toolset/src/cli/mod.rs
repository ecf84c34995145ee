//! CLI module for toolset
//!
//! Provides the server entry point and offline access to the audit log.

/// check-sql subcommand
pub mod check_sql;
/// logs subcommand
pub mod logs;
/// serve subcommand
pub mod serve;
/// stats subcommand
pub mod stats;

use clap::{Parser, Subcommand};

/// toolset - request diagnostics and audited data access
#[derive(Parser, Debug)]
#[command(name = "toolset")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    TOOLSET_HOST              Bind address (default: 0.0.0.0)
    TOOLSET_PORT              Listen port (default: 8000)
    TOOLSET_LOG_LEVEL         Log level (default: info)
    TOOLSET_SQL_DEBUG         Force debug logging (default: false)
    TOOLSET_APP_LOG_DIR       Directory for the rolling application log
    TOOLSET_LOG_BACKEND       Audit backend: file | sqlite | mysql (default: file)
    TOOLSET_LOG_DIR           JSONL audit directory (default: ./execution_logs)
    TOOLSET_LOG_FILE_PREFIX   JSONL file prefix (default: execution_logs)
    TOOLSET_SQLITE_PATH       SQLite audit database (default: ./execution_logs.db)
    TOOLSET_DB_HOST           MySQL host (default: 127.0.0.1)
    TOOLSET_DB_PORT           MySQL port (default: 3306)
    TOOLSET_DB_USER           MySQL user (default: root)
    TOOLSET_DB_PASSWORD       MySQL password
    TOOLSET_DB_NAME           MySQL database (default: execution_logs)
    TOOLSET_MAX_RESULT_BYTES  Audit result size cap (default: 65536)
    TOOLSET_AUDIT_REJECTED    Audit statements rejected by the safety check
    TOOLSET_CACHE_DB          Database queried by db/sql_query (default: ./cache.db)
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(serve::ServeArgs),
    /// Print audit records as JSON lines
    Logs(logs::LogsArgs),
    /// Print audit log statistics
    Stats(stats::StatsArgs),
    /// Classify a SQL statement with the read-only safety check
    CheckSql(check_sql::CheckSqlArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["toolset"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_logs_subcommand() {
        let cli = Cli::try_parse_from([
            "toolset",
            "logs",
            "--user",
            "alice",
            "--since",
            "2026-01-01T00:00:00Z",
            "--limit",
            "5",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Logs(args)) => {
                assert_eq!(args.user.as_deref(), Some("alice"));
                assert_eq!(args.limit, 5);
                assert!(args.since.is_some());
                assert!(args.until.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_sql_subcommand() {
        let cli = Cli::try_parse_from(["toolset", "check-sql", "SELECT 1"]).unwrap();
        match cli.command {
            Some(Commands::CheckSql(args)) => assert_eq!(args.sql, "SELECT 1"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_since_is_rejected() {
        assert!(Cli::try_parse_from(["toolset", "logs", "--since", "yesterday"]).is_err());
    }
}
