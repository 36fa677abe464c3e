//! crates/diary_core/src/compose.rs
//!
//! Builds the complete, self-contained HTML documents handed to the render
//! pipeline. The stylesheet is fixed and user content only enters through
//! the sanitizer (for the content body) or angle-bracket stripping (for
//! title, tags and mood).

use chrono::{DateTime, Utc};

use crate::domain::Entry;
use crate::sanitize::sanitize_html;

/// The document-level stylesheet. Not user-controllable.
const STYLESHEET: &str = r#"
  body { font-family: Georgia, 'Times New Roman', serif; color: #222; line-height: 1.6; }
  h1 { font-size: 22pt; margin-bottom: 2pt; }
  .meta { color: #666; font-size: 10pt; margin-bottom: 14pt; }
  .mood { font-size: 14pt; margin-right: 6pt; }
  .tag { display: inline-block; border: 1px solid #bbb; border-radius: 8px;
         padding: 1px 8px; margin-right: 4px; font-size: 9pt; color: #555; }
  .content { font-size: 11pt; }
  .content blockquote { border-left: 3px solid #ccc; margin-left: 0; padding-left: 12px; color: #555; }
  .cover { text-align: center; margin-top: 200px; }
  .cover h1 { font-size: 28pt; }
  .cover p { color: #666; }
  .footer { margin-top: 24pt; padding-top: 6pt; border-top: 1px solid #ddd;
            color: #999; font-size: 8pt; }
  .page-break { page-break-after: always; }
"#;

/// Strips angle brackets from user-supplied text destined for HTML text
/// nodes or attribute positions. Independent of the content sanitizer,
/// which only covers the content field.
fn strip_markup(text: &str) -> String {
    text.chars().filter(|c| *c != '<' && *c != '>').collect()
}

fn document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <style>{STYLESHEET}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

fn entry_block(entry: &Entry) -> String {
    let title = strip_markup(&entry.title);
    let date = entry.created_at.format("%B %d, %Y");

    let mood = entry
        .mood
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(|m| format!("<span class=\"mood\">{}</span>", strip_markup(m)))
        .unwrap_or_default();

    let tags = entry
        .tags
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| format!("<span class=\"tag\">{}</span>", strip_markup(t)))
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|chips| !chips.is_empty())
        .map(|chips| format!("<div class=\"tags\">{chips}</div>"))
        .unwrap_or_default();

    let content = sanitize_html(&entry.content);

    format!(
        "<div class=\"entry\">\n<h1>{title}</h1>\n\
         <div class=\"meta\">{mood}{date}</div>\n{tags}\n\
         <div class=\"content\">{content}</div>\n</div>"
    )
}

fn footer(exported_at: DateTime<Utc>) -> String {
    format!(
        "<div class=\"footer\">Exported on {}</div>",
        exported_at.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Composes the document for a single-entry export.
pub fn compose_single(entry: &Entry, exported_at: DateTime<Utc>) -> String {
    let body = format!("{}\n{}", entry_block(entry), footer(exported_at));
    document(&body)
}

/// Composes the document for a bulk export. Entries are rendered in the
/// order given; callers pass them most-recent-first. A page break follows
/// the cover and every entry except the last.
pub fn compose_bulk(entries: &[Entry], exported_at: DateTime<Utc>) -> String {
    let mut body = format!(
        "<div class=\"cover\">\n<h1>Diary Entries</h1>\n\
         <p>{} entries &middot; exported {}</p>\n</div>\n\
         <div class=\"page-break\"></div>",
        entries.len(),
        exported_at.format("%B %d, %Y")
    );

    for (i, entry) in entries.iter().enumerate() {
        body.push('\n');
        body.push_str(&entry_block(entry));
        if i + 1 < entries.len() {
            body.push_str("\n<div class=\"page-break\"></div>");
        }
    }

    body.push('\n');
    body.push_str(&footer(exported_at));
    document(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(title: &str, content: &str, tags: Option<&str>, mood: Option<&str>) -> Entry {
        let now = Utc::now();
        Entry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.map(String::from),
            mood: mood.map(String::from),
            passcode_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn page_breaks(html: &str) -> usize {
        html.matches("<div class=\"page-break\"></div>").count()
    }

    #[test]
    fn single_document_is_self_contained() {
        let e = entry("A day", "<p>rain</p>", Some("weather,home"), Some("😊"));
        let html = compose_single(&e, Utc::now());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("<h1>A day</h1>"));
        assert!(html.contains("<p>rain</p>"));
        assert!(html.contains("<span class=\"mood\">😊</span>"));
        assert!(html.contains("<span class=\"tag\">weather</span>"));
        assert!(html.contains("<span class=\"tag\">home</span>"));
        assert!(html.contains("Exported on"));
        assert_eq!(page_breaks(&html), 0);
    }

    #[test]
    fn header_fields_cannot_inject_markup() {
        let e = entry(
            "<script>alert(1)</script>",
            "<p>ok</p>",
            Some("<b>tag</b>"),
            Some("<img>"),
        );
        let html = compose_single(&e, Utc::now());

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>tag</b>"));
        assert!(!html.contains("<img>"));
        // The stripped text itself survives.
        assert!(html.contains("scriptalert(1)/script"));
    }

    #[test]
    fn content_goes_through_the_sanitizer() {
        let e = entry("t", "<p onclick=x>hi</p><script>bad()</script>", None, None);
        let html = compose_single(&e, Utc::now());
        assert!(html.contains("<p>hi</p>"));
        assert!(!html.contains("onclick"));
        assert!(!html.contains("bad()"));
    }

    #[test]
    fn optional_fields_are_omitted_cleanly() {
        let e = entry("t", "<p>c</p>", None, None);
        let html = compose_single(&e, Utc::now());
        assert!(!html.contains("class=\"mood\""));
        assert!(!html.contains("class=\"tags\""));
    }

    #[test]
    fn bulk_cover_states_the_entry_count() {
        let entries: Vec<Entry> = (0..3)
            .map(|i| entry(&format!("e{i}"), "<p>c</p>", None, None))
            .collect();
        let html = compose_bulk(&entries, Utc::now());
        assert!(html.contains("3 entries"));
        assert!(html.contains("class=\"cover\""));
    }

    #[test]
    fn bulk_breaks_after_every_entry_except_the_last() {
        for n in 1..=4 {
            let entries: Vec<Entry> = (0..n)
                .map(|i| entry(&format!("e{i}"), "<p>c</p>", None, None))
                .collect();
            let html = compose_bulk(&entries, Utc::now());
            // One break after the cover, then one between each entry pair.
            assert_eq!(page_breaks(&html), n, "for {n} entries");
        }
    }

    #[test]
    fn bulk_preserves_caller_order() {
        let entries = vec![
            entry("first", "<p>c</p>", None, None),
            entry("second", "<p>c</p>", None, None),
        ];
        let html = compose_bulk(&entries, Utc::now());
        let a = html.find("<h1>first</h1>").expect("first present");
        let b = html.find("<h1>second</h1>").expect("second present");
        assert!(a < b);
    }
}
