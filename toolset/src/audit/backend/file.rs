//! JSONLファイルバックエンド
//!
//! 1レコード1行のJSONを `<dir>/<prefix>_<YYYY-MM-DD>.jsonl` に追記する。
//! 暦日ごとに別ファイルとなり、検索はファイルを読み込んでメモリ上でフィルタする。

use super::AuditBackend;
use crate::audit::types::{AuditQuery, AuditRecord};
use crate::common::error::ToolsetResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// 追記専用のJSONLファイルバックエンド
pub struct FileBackend {
    dir: PathBuf,
    prefix: String,
    /// 同時追記で行が混ざらないよう書き込みを直列化する
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// 新しいFileBackendを作成（ディレクトリは初回書き込み時に作成）
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// ログディレクトリ
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 指定日のログファイルパス
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.jsonl", self.prefix, date.format("%Y-%m-%d")))
    }

    /// ファイル名から日付を取り出す（このバックエンドのファイルでなければ `None`）
    fn date_of(&self, file_name: &str) -> Option<NaiveDate> {
        let rest = file_name.strip_prefix(&self.prefix)?.strip_prefix('_')?;
        let date = rest.strip_suffix(".jsonl")?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    /// ディレクトリ内のログファイルを日付の新しい順に列挙
    async fn day_files(&self) -> ToolsetResult<Vec<(NaiveDate, PathBuf)>> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(date) = name.to_str().and_then(|n| self.date_of(n)) {
                files.push((date, entry.path()));
            }
        }

        files.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(files)
    }

    /// 1ファイル分のレコードを読み込む（壊れた行はスキップ）
    async fn read_file(path: &Path) -> ToolsetResult<Vec<AuditRecord>> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut records = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => debug!(
                    path = %path.display(),
                    line = line_num + 1,
                    "Skipping unparsable audit log line: {}",
                    e
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl AuditBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn append(&self, record: &AuditRecord) -> ToolsetResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(record.timestamp.date_naive()))
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> ToolsetResult<Vec<AuditRecord>> {
        let start_date = query.start.map(|t| t.date_naive());
        let end_date = query.end.map(|t| t.date_naive());

        let mut records = Vec::new();
        for (date, path) in self.day_files().await? {
            if start_date.is_some_and(|d| date < d) || end_date.is_some_and(|d| date > d) {
                continue;
            }
            records.extend(
                Self::read_file(&path)
                    .await?
                    .into_iter()
                    .filter(|r| r.matches(query)),
            );
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(query.limit);
        Ok(records)
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> ToolsetResult<u64> {
        let cutoff_date = cutoff.date_naive();
        let _guard = self.write_lock.lock().await;

        let mut removed = 0u64;
        for (date, path) in self.day_files().await? {
            if date >= cutoff_date {
                continue;
            }
            removed += Self::read_file(&path).await?.len() as u64;
            tokio::fs::remove_file(&path).await?;
            debug!(path = %path.display(), "Removed expired audit log file");
        }
        Ok(removed)
    }
}
