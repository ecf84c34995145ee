//! 監査ログの型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// アクター未設定時に記録される識別子
pub const DEFAULT_ACTOR: &str = "system";

/// コマンド種別のデフォルト値
pub const DEFAULT_COMMAND_TYPE: &str = "sql";

/// クエリ件数のデフォルト上限
pub const DEFAULT_QUERY_LIMIT: usize = 100;

fn default_command_type() -> String {
    DEFAULT_COMMAND_TYPE.to_string()
}

/// 監査レコード（実行されたコマンド1件）
///
/// JSONL形式では `actor` は `user` キーで出力される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// レコードID（リレーショナルストア挿入後に設定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// 実行完了時刻
    pub timestamp: DateTime<Utc>,
    /// 実行者
    #[serde(rename = "user")]
    pub actor: String,
    /// コマンド原文
    pub command: String,
    /// 実行結果（構造化、または文字列化・切り詰め済み）
    pub result: Value,
    /// 実行時間（ミリ秒）
    pub time_cost_ms: u64,
    /// コマンド種別（"sql" など）
    #[serde(default = "default_command_type")]
    pub command_type: String,
}

impl AuditRecord {
    /// 現在時刻で新しいレコードを作成
    pub fn new(
        actor: impl Into<String>,
        command: impl Into<String>,
        result: Value,
        time_cost_ms: u64,
    ) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            actor: actor.into(),
            command: command.into(),
            result,
            time_cost_ms,
            command_type: default_command_type(),
        }
    }

    /// コマンド種別を指定
    pub fn with_command_type(mut self, command_type: impl Into<String>) -> Self {
        self.command_type = command_type.into();
        self
    }

    /// 結果が失敗を表すかどうか
    ///
    /// オブジェクトなら `error` キーまたは `success == false`、
    /// 文字列なら "error" を含む（大文字小文字無視）場合に失敗とみなす。
    pub fn is_error(&self) -> bool {
        match &self.result {
            Value::Object(map) => {
                let has_error = map
                    .get("error")
                    .map(|v| !v.is_null() && v != &Value::Bool(false) && v != "")
                    .unwrap_or(false);
                has_error || map.get("success") == Some(&Value::Bool(false))
            }
            Value::String(s) => s.to_ascii_lowercase().contains("error"),
            _ => false,
        }
    }

    /// 指定フィルタに一致するかどうか（ファイルバックエンドのメモリ上フィルタ用）
    pub fn matches(&self, query: &AuditQuery) -> bool {
        if let Some(ref actor) = query.actor {
            if &self.actor != actor {
                return false;
            }
        }
        if let Some(start) = query.start {
            if self.timestamp < start {
                return false;
            }
        }
        if let Some(end) = query.end {
            if self.timestamp > end {
                return false;
            }
        }
        true
    }
}

/// 監査ログ検索条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// 実行者でフィルタ
    pub actor: Option<String>,
    /// 開始日時（この時刻を含む）
    pub start: Option<DateTime<Utc>>,
    /// 終了日時（この時刻を含む）
    pub end: Option<DateTime<Utc>>,
    /// 最大件数
    pub limit: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            actor: None,
            start: None,
            end: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl AuditQuery {
    /// 実行者で絞り込む
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// 開始日時を指定
    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// 終了日時を指定
    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// 最大件数を指定
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}
