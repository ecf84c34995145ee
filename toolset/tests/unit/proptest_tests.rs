//! Property-based tests using proptest

use proptest::prelude::*;

use toolset::diagnostics::{DiagnosticBuffer, EntryKind, RequestContext};
use toolset::guard::{self, DENIED_KEYWORDS, REASON_ALLOWED};

fn entry_kind() -> impl Strategy<Value = EntryKind> {
    prop_oneof![
        Just(EntryKind::Info),
        Just(EntryKind::Warning),
        Just(EntryKind::Error),
    ]
}

/// 大文字小文字を混ぜる
fn mix_case(word: &str, mask: &[bool]) -> String {
    word.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// 区切りとして使える（判定結果を変えない）文字列
fn filler() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(" ".to_string()),
        Just("  \t ".to_string()),
        Just("\n".to_string()),
        Just(" /* note */ ".to_string()),
        Just("/**/".to_string()),
        Just(" -- trailing note\n".to_string()),
        Just(" -- /* opened in line note\n".to_string()),
        Just(" /* -- closed */ ".to_string()),
    ]
}

// ---------------------------------------------------------------------------
// DiagnosticBuffer
// ---------------------------------------------------------------------------

proptest! {
    /// エントリは記録順に並ぶ
    #[test]
    fn entries_preserve_recording_order(
        items in prop::collection::vec((entry_kind(), "[a-z0-9 ]{0,16}"), 0..32),
    ) {
        let mut buffer = DiagnosticBuffer::default();
        for (i, (kind, content)) in items.iter().enumerate() {
            buffer.record(*kind, format!("t{}", i), content.clone());
        }

        prop_assert_eq!(buffer.entries().len(), items.len());
        for (i, (entry, (kind, content))) in buffer.entries().iter().zip(&items).enumerate() {
            prop_assert_eq!(&entry.title, &format!("t{}", i));
            prop_assert_eq!(&entry.content, content);
            prop_assert_eq!(entry.kind, *kind);
        }
    }

    /// 一度エラーを記録したら status は true に戻らない
    #[test]
    fn status_is_monotonic(kinds in prop::collection::vec(entry_kind(), 0..32)) {
        let mut buffer = DiagnosticBuffer::default();
        let mut seen_error = false;
        for kind in &kinds {
            buffer.record(*kind, "t", "c");
            seen_error |= *kind == EntryKind::Error;
            prop_assert_eq!(buffer.status(), !seen_error);
        }
    }

    /// error は最後に記録したエラーの本文
    #[test]
    fn error_is_last_error_content(
        items in prop::collection::vec((entry_kind(), "[a-z]{1,8}"), 0..32),
    ) {
        let mut buffer = DiagnosticBuffer::default();
        for (kind, content) in &items {
            buffer.record(*kind, "t", content.clone());
        }
        let expected = items
            .iter()
            .rev()
            .find(|(kind, _)| *kind == EntryKind::Error)
            .map(|(_, content)| content.as_str())
            .unwrap_or("");
        prop_assert_eq!(buffer.error(), expected);
    }

    /// reset は実行者を残してバッファだけを空にする
    #[test]
    fn reset_keeps_actor(actor in "[a-z]{1,12}", n in 0usize..8) {
        let mut ctx = RequestContext::new();
        ctx.set_current_actor(actor.clone());
        for _ in 0..n {
            ctx.show_error("boom", None);
        }
        ctx.reset();

        let envelope = ctx.snapshot();
        prop_assert!(envelope.status);
        prop_assert!(envelope.output.is_empty());
        prop_assert_eq!(ctx.actor(), actor.as_str());
    }
}

// ---------------------------------------------------------------------------
// guard::classify
// ---------------------------------------------------------------------------

proptest! {
    /// 禁止語は大文字小文字・コメント・空白で隠しても検出される
    #[test]
    fn denied_keyword_detected_through_obfuscation(
        idx in 0usize..DENIED_KEYWORDS.len(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        before in filler(),
        after in filler(),
    ) {
        let keyword = DENIED_KEYWORDS[idx];
        let sql = format!("SELECT 1{}{}{}c_x", before, mix_case(keyword, &mask), after);
        let decision = guard::classify(&sql);
        prop_assert!(!decision.allowed, "expected denied: {:?}", sql);
        prop_assert_eq!(decision.reason, keyword);
    }

    /// 禁止語を含まない SELECT は許可される
    #[test]
    fn plain_select_is_allowed(
        column in "[a-z]{1,8}",
        table in "[a-z]{1,8}",
        mask in prop::collection::vec(any::<bool>(), 1..8),
        gap in filler(),
    ) {
        let sql = format!(
            "{}{}c_{} FROM t_{}",
            mix_case("select", &mask),
            gap,
            column,
            table
        );
        let decision = guard::classify(&sql);
        prop_assert!(decision.allowed, "expected allowed: {:?} -> {:?}", sql, decision);
        prop_assert_eq!(decision.reason, REASON_ALLOWED);
    }

    /// 正規化は冪等
    #[test]
    fn normalize_is_idempotent(sql in "[ -~\n\t]{0,64}") {
        let once = guard::normalize(&sql);
        prop_assert_eq!(guard::normalize(&once), once.clone());
    }

    /// 判定は入力のみで決まる
    #[test]
    fn classify_is_deterministic(sql in "[ -~\n]{0,64}") {
        prop_assert_eq!(guard::classify(&sql), guard::classify(&sql));
    }
}
