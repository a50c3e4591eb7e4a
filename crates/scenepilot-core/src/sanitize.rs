//! Text sanitizer — repairs backslash-escaped underscores emitted by models.
//!
//! Some models escape underscores as if writing Markdown (`delete\_object`),
//! which breaks tool names, URLs and JSON keys. Every piece of text crossing
//! the model boundary goes through [`sanitize`].

/// Replace every run of backslashes directly followed by `_` with a bare `_`.
///
/// Covers both the `\_` and `\\_` forms. Collapsing the whole run (rather
/// than a fixed number of backslashes) keeps the transform idempotent.
/// Backslashes not followed by an underscore are left untouched.
pub fn sanitize(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut pending_backslashes = 0usize;

    for c in text.chars() {
        match c {
            '\\' => pending_backslashes += 1,
            '_' => {
                pending_backslashes = 0;
                out.push('_');
            }
            other => {
                out.extend(std::iter::repeat('\\').take(pending_backslashes));
                pending_backslashes = 0;
                out.push(other);
            }
        }
    }
    out.extend(std::iter::repeat('\\').take(pending_backslashes));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_backslash() {
        assert_eq!(sanitize(r"delete\_object\_42"), "delete_object_42");
    }

    #[test]
    fn test_double_backslash() {
        assert_eq!(sanitize(r"requests\\_get"), "requests_get");
    }

    #[test]
    fn test_mixed_forms() {
        assert_eq!(sanitize(r"a\_b\\_c_d"), "a_b_c_d");
    }

    #[test]
    fn test_no_backslashes_unchanged() {
        let text = "Action: requests_get\nAction Input: {\"url\": \"/objects\"}";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn test_other_escapes_preserved() {
        let text = r#"{"name": "line\nbreak", "path": "C:\\scenes", "q": "\"x\""}"#;
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn test_trailing_backslash_preserved() {
        assert_eq!(sanitize(r"ends with \"), r"ends with \");
        assert_eq!(sanitize(r"two \\"), r"two \\");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            r"plain",
            r"a\_b",
            r"a\\_b",
            r"a\\\_b",
            r"a\\\\_b",
            r"\\n\_\\",
            r"__\__\\__",
            "unicode ünïcödé\\_ok",
            "",
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_only_underscore_sequences_change() {
        let input = r"x\_y \q \\z \\_w";
        let out = sanitize(input);
        assert_eq!(out, r"x_y \q \\z _w");
    }
}
