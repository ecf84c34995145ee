//! リクエスト単位の診断バッファ
//!
//! 業務処理は独自のレスポンスを組み立てる代わりに、`RequestContext` に
//! 診断エントリを追記する。ディスパッチ境界が最後にスナップショットを取り、
//! 1リクエストにつき1つの `Envelope` として返す。
//!
//! コンテキストは `&mut` で明示的に受け渡すため、並行リクエスト間で
//! バッファや実行者が共有されることはない。

use crate::audit::types::{AuditRecord, DEFAULT_ACTOR};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// エントリ種別
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// 情報
    #[default]
    Info,
    /// 警告
    Warning,
    /// エラー（`status` を false にする）
    Error,
}

impl EntryKind {
    /// 種別ごとのデフォルトタイトル
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

/// 診断エントリ1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// タイトル
    #[serde(rename = "Title")]
    pub title: String,
    /// 本文
    #[serde(rename = "Content")]
    pub content: String,
    /// 種別（JSONには出力しない）
    #[serde(skip)]
    pub kind: EntryKind,
}

/// 1リクエスト分のレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// エラーが1件も記録されていなければ true
    pub status: bool,
    /// 記録順のエントリ
    pub output: Vec<Entry>,
    /// 最後に記録されたエラーの本文（成功時は空）
    pub error: String,
    /// このリクエスト中に書き込まれた監査レコード
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_logs: Vec<AuditRecord>,
}

/// 診断バッファ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticBuffer {
    status: bool,
    output: Vec<Entry>,
    error: String,
}

impl Default for DiagnosticBuffer {
    fn default() -> Self {
        Self {
            status: true,
            output: Vec::new(),
            error: String::new(),
        }
    }
}

impl DiagnosticBuffer {
    /// 空のバッファに戻す
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// エントリを追記する
    ///
    /// エラーの場合は `status` を false にし、`error` を本文で上書きする（最後のエラーが残る）。
    pub fn record(
        &mut self,
        kind: EntryKind,
        title: impl Into<String>,
        content: impl Into<String>,
    ) {
        let content = content.into();
        if kind == EntryKind::Error {
            self.status = false;
            self.error = content.clone();
        }
        self.output.push(Entry {
            title: title.into(),
            content,
            kind,
        });
    }

    /// 現在の状態
    pub fn status(&self) -> bool {
        self.status
    }

    /// 記録済みエントリ
    pub fn entries(&self) -> &[Entry] {
        &self.output
    }

    /// 最後のエラー本文
    pub fn error(&self) -> &str {
        &self.error
    }
}

/// リクエストの実行コンテキスト
///
/// 診断バッファ、実行者、このリクエストの監査記録を保持する。
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    buffer: DiagnosticBuffer,
    actor: Option<String>,
    execution_logs: Vec<AuditRecord>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// 新しいコンテキストを作成
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            buffer: DiagnosticBuffer::default(),
            actor: None,
            execution_logs: Vec::new(),
        }
    }

    /// リクエストID
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// バッファと監査記録を初期化する（実行者の紐付けは維持）
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.execution_logs.clear();
    }

    /// エントリを追記
    pub fn record(
        &mut self,
        kind: EntryKind,
        title: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.buffer.record(kind, title, content);
    }

    /// 情報エントリを追記（タイトル省略時は "Info"）
    pub fn show_info(&mut self, content: impl Into<String>, title: Option<&str>) {
        self.show(EntryKind::Info, content, title);
    }

    /// 警告エントリを追記（タイトル省略時は "Warning"）
    pub fn show_warning(&mut self, content: impl Into<String>, title: Option<&str>) {
        self.show(EntryKind::Warning, content, title);
    }

    /// エラーエントリを追記（タイトル省略時は "Error"）
    pub fn show_error(&mut self, content: impl Into<String>, title: Option<&str>) {
        self.show(EntryKind::Error, content, title);
    }

    fn show(&mut self, kind: EntryKind, content: impl Into<String>, title: Option<&str>) {
        let title = title.unwrap_or(kind.default_title());
        self.buffer.record(kind, title, content);
    }

    /// 実行者を紐付ける
    pub fn set_current_actor(&mut self, actor: impl Into<String>) {
        self.actor = Some(actor.into());
    }

    /// 紐付けられた実行者（未設定なら "system"）
    pub fn actor(&self) -> &str {
        self.actor.as_deref().unwrap_or(DEFAULT_ACTOR)
    }

    /// 診断バッファ
    pub fn buffer(&self) -> &DiagnosticBuffer {
        &self.buffer
    }

    /// 監査記録を追加（監査ロガーから呼ばれる）
    pub fn push_execution_log(&mut self, record: AuditRecord) {
        self.execution_logs.push(record);
    }

    /// このリクエスト中の監査記録
    pub fn execution_logs(&self) -> &[AuditRecord] {
        &self.execution_logs
    }

    /// 現在の内容をエンベロープとして複製する（バッファはクリアしない）
    pub fn snapshot(&self) -> Envelope {
        Envelope {
            status: self.buffer.status,
            output: self.buffer.output.clone(),
            error: self.buffer.error.clone(),
            execution_logs: self.execution_logs.clone(),
        }
    }
}
