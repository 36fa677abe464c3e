//! crates/diary_core/src/sanitize.rs
//!
//! Best-effort textual filter for user-authored rich-text HTML.
//!
//! This is a regex pass, not an HTML parser. Content originates from the
//! application's own editor, so the filter is defense-in-depth before the
//! rendering engine sees the markup; it is not a substitute for a real
//! sanitizer against arbitrary hostile HTML.

use std::sync::LazyLock;

use regex::Regex;

/// Filters applied on every pass, in order. Each is a (pattern, replacement)
/// pair; the replacement is always plain text, never a capture reference.
static FILTERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Script and iframe elements, including their contents. Orphan
        // opening tags are removed separately so a missing close tag cannot
        // smuggle the element through.
        (r"(?is)<script\b[^>]*>.*?</script\s*>", ""),
        (r"(?is)<script\b[^>]*>", ""),
        (r"(?is)</script\s*>", ""),
        (r"(?is)<iframe\b[^>]*>.*?</iframe\s*>", ""),
        (r"(?is)<iframe\b[^>]*>", ""),
        (r"(?is)</iframe\s*>", ""),
        // Inline event handlers: onclick, onerror, onload, ...
        (r#"(?i)\son[a-z0-9_]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#, ""),
        // Active URL schemes, wherever they appear in attribute values.
        (r"(?i)(?:javascript|data)\s*:", ""),
        // Presentation attributes; the composer's stylesheet is the only
        // styling authority.
        (r#"(?i)\s(?:style|class)\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#, ""),
        // Embedded images are excluded from export entirely.
        (r"(?is)<img\b[^>]*>", ""),
        // Editor artifacts: empty paragraphs and stacked line breaks.
        (r"(?is)<p[^>]*>(?:\s|&nbsp;|<br\s*/?>)*</p\s*>", ""),
        (r"(?is)(?:<br\s*/?>\s*){2,}", "<br>"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        let re = Regex::new(pattern).expect("static sanitizer pattern must compile");
        (re, replacement)
    })
    .collect()
});

/// Passes are repeated until the output stops changing, so payloads that
/// reassemble themselves after one removal (`<scr<script>ipt>` and friends)
/// do not survive, and the whole function is idempotent.
const MAX_PASSES: usize = 16;

/// Reduces rich-text HTML to the subset the document composer embeds.
pub fn sanitize_html(input: &str) -> String {
    let mut current = input.to_string();
    for _ in 0..MAX_PASSES {
        let mut next = current.clone();
        for (re, replacement) in FILTERS.iter() {
            next = re.replace_all(&next, *replacement).into_owned();
        }
        if next == current {
            return next;
        }
        current = next;
    }
    current
}
