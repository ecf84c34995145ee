//! SQL安全判定
//!
//! コマンド文字列を正規化（コメント除去・空白圧縮）したうえで、
//! 許可プレフィックスと禁止キーワードにより許可/拒否を判定する純粋関数。
//!
//! 構文解析は行わない。文字列リテラルや引用識別子の中の語も検出対象になる
//! （例: `CASE ... END` や `'please delete me'` は拒否される）。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 許可される文の先頭語
pub const ALLOWED_PREFIXES: [&str; 4] = ["select", "with", "explain", "pragma"];

/// 文中のどこにあっても拒否となる語
pub const DENIED_KEYWORDS: [&str; 20] = [
    "insert", "update", "delete", "drop", "create", "alter", "truncate", "grant", "revoke",
    "commit", "rollback", "savepoint", "release", "exec", "execute", "call", "declare", "set",
    "begin", "end",
];

/// 空文の拒否理由
pub const REASON_EMPTY: &str = "empty statement";

/// 許可プレフィックス以外で始まる文の拒否理由
pub const REASON_NOT_READ_ONLY: &str =
    "only SELECT, WITH, EXPLAIN and PRAGMA statements are allowed";

/// 許可時の理由
pub const REASON_ALLOWED: &str = "allowed";

/// ブロックコメントと行コメントを1つの左から右への走査で扱う（先に開いた方が優先）
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|--[^\n]*").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DENIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(?:{})\b", DENIED_KEYWORDS.join("|"))).expect("valid regex")
});
static ALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?:{})\b", ALLOWED_PREFIXES.join("|"))).expect("valid regex")
});

/// 判定結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyDecision {
    /// 許可されたか
    pub allowed: bool,
    /// 理由（拒否時は一致した禁止語など）
    pub reason: String,
}

impl SafetyDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: REASON_ALLOWED.to_string(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// コメントを除去し、空白を1つに圧縮して小文字化する
///
/// コメントは空白に置き換える（`DR/**/OP` は2語として扱われる）。
/// 行コメント内の `/*` や、ブロックコメント内の `--` はコメントの一部として扱う。
pub fn normalize(sql: &str) -> String {
    let without_comments = COMMENT.replace_all(sql, " ");
    WHITESPACE
        .replace_all(&without_comments, " ")
        .trim()
        .to_lowercase()
}

/// 文を判定する
pub fn classify(sql: &str) -> SafetyDecision {
    let normalized = normalize(sql);
    if normalized.is_empty() {
        return SafetyDecision::deny(REASON_EMPTY);
    }

    if let Some(found) = DENIED.find(&normalized) {
        return SafetyDecision::deny(found.as_str());
    }

    if ALLOWED.is_match(&normalized) {
        SafetyDecision::allow()
    } else {
        SafetyDecision::deny(REASON_NOT_READ_ONLY)
    }
}

/// 正規化後の文が許可プレフィックスで始まるか（禁止語は見ない）
pub fn starts_with_read_prefix(sql: &str) -> bool {
    ALLOWED.is_match(&normalize(sql))
}
