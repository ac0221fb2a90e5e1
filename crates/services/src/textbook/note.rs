use serde::Deserialize;
use serde_json::Value;

/// A textbook note ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    pub title: String,
    pub html: String,
    /// Whether the note was decoded from the structured JSON format.
    pub structured: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NoteRecord {
    title: Option<String>,
    body: Option<String>,
    links: Option<String>,
    media: Option<String>,
}

/// Decode a note file body.
///
/// Notes are usually a JSON array whose first element carries `title`,
/// `body`, `links` and `media` HTML fragments. Anything else is treated as a
/// plain HTML document titled after its filename.
#[must_use]
pub fn decode_note(body: &str, filename: &str) -> RenderedNote {
    if let Some(record) = first_record(body) {
        let title = record.title.unwrap_or_default();
        let links = non_empty(record.links)
            .unwrap_or_else(|| "<p>No links available.</p>".to_string());
        let media = non_empty(record.media)
            .unwrap_or_else(|| "<p>No media available.</p>".to_string());
        let html = format!(
            "<h1>{title}</h1>\n{body}\n<hr>\n<h4>Links</h4>\n{links}\n<h4>Media</h4>\n{media}",
            body = record.body.unwrap_or_default(),
        );
        return RenderedNote {
            title,
            html,
            structured: true,
        };
    }

    RenderedNote {
        title: title_from_filename(filename),
        html: body.to_string(),
        structured: false,
    }
}

fn first_record(body: &str) -> Option<NoteRecord> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    let first = items.into_iter().next()?;
    serde_json::from_value(first).ok()
}

fn non_empty(fragment: Option<String>) -> Option<String> {
    fragment.filter(|f| !f.trim().is_empty())
}

/// `1_137_Atrial_fibrillation.html` → `1 137 Atrial fibrillation`.
#[must_use]
pub fn title_from_filename(filename: &str) -> String {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    name.replacen(".html", "", 1).replace('_', " ")
}

/// Reduce an HTML fragment to readable terminal text.
///
/// The fragment goes through `html2md`, so entities are decoded by a real HTML
/// parser and structure survives as light markdown (`**bold**`, list
/// bullets, `[text](href)`). Markdown backslash escapes are dropped because
/// the text is shown as-is, and blank lines are collapsed.
#[must_use]
pub fn plain_text(html: &str) -> String {
    let markdown = html2md::parse_html(html);
    unescape_markdown(&markdown)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut chars = markdown.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_note_is_composed() {
        let note = decode_note(
            r#"[{"title":"Atrial fibrillation","body":"<p>AF</p>","links":"","media":"<img src=x>"}]"#,
            "1_137_Atrial_fibrillation.html",
        );
        assert!(note.structured);
        assert_eq!(note.title, "Atrial fibrillation");
        assert!(note.html.starts_with("<h1>Atrial fibrillation</h1>"));
        assert!(note.html.contains("<p>AF</p>"));
        assert!(note.html.contains("No links available."));
        assert!(note.html.contains("<img src=x>"));
        assert!(!note.html.contains("No media available."));
    }

    #[test]
    fn html_note_falls_back_to_filename_title() {
        let body = "<h1>Heart failure</h1><p>...</p>";
        let note = decode_note(body, "textbook/1_140_Heart_failure.html");
        assert!(!note.structured);
        assert_eq!(note.title, "1 140 Heart failure");
        assert_eq!(note.html, body);
    }

    #[test]
    fn plain_text_keeps_line_structure() {
        let text = plain_text("<p>Line one</p><p>Line&nbsp;two<br />A &amp; B</p>");
        assert_eq!(text, "Line one\nLine two\nA & B");
    }

    #[test]
    fn plain_text_keeps_comparison_signs() {
        let text = plain_text("<p>Give insulin if K < 3.5 or glucose > 11 mmol/L</p>");
        assert_eq!(text, "Give insulin if K < 3.5 or glucose > 11 mmol/L");
    }

    #[test]
    fn plain_text_decodes_named_entities() {
        let text = plain_text("<p>Temp 38&deg;C &mdash; caf&eacute;</p>");
        assert_eq!(text, "Temp 38\u{b0}C \u{2014} caf\u{e9}");
    }

    #[test]
    fn plain_text_keeps_emphasis_as_markdown() {
        let text = plain_text("<p>Dose <b>5 mg</b> daily</p>");
        assert!(text.contains("5 mg"));
        assert!(text.starts_with("Dose"));
        assert!(text.ends_with("daily"));
    }

    #[test]
    fn unescape_drops_markdown_escapes_only() {
        assert_eq!(unescape_markdown(r"K \< 3.5 \* 2"), "K < 3.5 * 2");
        assert_eq!(unescape_markdown(r"C:\dir"), r"C:\dir");
    }

    #[test]
    fn empty_or_non_array_json_is_treated_as_html() {
        assert!(!decode_note("[]", "1_1_x.html").structured);
        assert!(!decode_note(r#"{"title":"x"}"#, "1_1_x.html").structured);
    }
}
