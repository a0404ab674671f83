//! Text cleanup applied to learner input before it reaches the generation
//! service, and to model output before it becomes a candidate.

use regex::Regex;
use std::sync::LazyLock;

static NON_PRINTABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x20-\x7E\xA0-\xFF]").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Escapes backslashes and double quotes and drops C0 controls and DEL so the
/// text can sit inside a quoted string of a structured request.
pub fn sanitize_for_embedding(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c if (c as u32) < 0x20 || c == '\u{7F}' => {}
            c => out.push(c),
        }
    }
    out
}

/// Replaces everything outside printable ASCII and printable Latin-1 with a
/// space, collapses whitespace runs and trims. Idempotent.
pub fn sanitize_for_model(text: &str) -> String {
    let printable = NON_PRINTABLE.replace_all(text, " ");
    WHITESPACE_RUN
        .replace_all(&printable, " ")
        .trim()
        .to_string()
}

/// Cleans a string field returned by the model: keeps line breaks, drops other
/// control characters, trims.
pub fn normalize_field(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_empty_input() {
        assert_eq!(sanitize_for_embedding(""), "");
    }

    #[test]
    fn test_embedding_escapes_backslash_and_quote() {
        assert_eq!(
            sanitize_for_embedding(r#"path C:\tmp "quoted""#),
            r#"path C:\\tmp \"quoted\""#
        );
    }

    #[test]
    fn test_embedding_strips_control_characters() {
        assert_eq!(sanitize_for_embedding("a\u{0}b\tc\nd\u{7F}e"), "abcde");
        // non-ASCII text passes through untouched
        assert_eq!(sanitize_for_embedding("zażółć"), "zażółć");
    }

    #[test]
    fn test_model_collapses_and_trims() {
        assert_eq!(
            sanitize_for_model("  Hello,\n\n\tworld!  \u{1F600} again "),
            "Hello, world! again"
        );
        assert_eq!(sanitize_for_model("café déjà vu"), "café déjà vu");
        assert_eq!(sanitize_for_model("日本語"), "");
    }

    #[test]
    fn test_model_is_idempotent() {
        let samples = [
            "",
            "   ",
            "plain text",
            "tabs\tand\nnewlines\r\n",
            "mixed \u{00A0}nbsp\u{00A0}\u{00A0}runs",
            "emoji \u{1F680} rocket \u{200B}zero-width",
            "control \u{1}\u{7F}\u{85} chars",
            "ÀÉÎÕÜ ñ ß ÿ",
        ];
        for sample in samples {
            let once = sanitize_for_model(sample);
            assert_eq!(sanitize_for_model(&once), once, "input: {:?}", sample);
        }
    }

    #[test]
    fn test_normalize_field_keeps_newlines() {
        assert_eq!(normalize_field("  line one\nline\u{7}two \t"), "line one\nlinetwo");
    }
}
