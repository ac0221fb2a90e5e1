use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use quiz_core::model::NoteId;

use super::note::plain_text;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#)
        .expect("anchor pattern compiles")
});
static NOTE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+_[0-9]+)_").expect("note file pattern compiles"));

/// One note link found in the textbook index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub note_id: NoteId,
    pub filename: String,
    /// Link text with markup stripped.
    pub title: String,
}

/// Mapping from note id to note filename, parsed from a module's textbook
/// index page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextbookIndex {
    notes: BTreeMap<NoteId, String>,
    entries: Vec<IndexEntry>,
}

impl TextbookIndex {
    /// Collect every anchor whose target filename starts with
    /// `<digits>_<digits>_`. Other links are ignored. A later link to the same
    /// note id replaces the earlier filename.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let mut index = Self::default();
        for captures in ANCHOR.captures_iter(html) {
            let href = captures.get(1).map_or("", |m| m.as_str());
            let filename = href.rsplit('/').next().unwrap_or(href);
            let Some(id) = NOTE_FILE.captures(filename).and_then(|c| c.get(1)) else {
                continue;
            };
            let note_id = NoteId::new(id.as_str());
            let title = captures.get(2).map_or_else(String::new, |m| plain_text(m.as_str()));

            index.notes.insert(note_id.clone(), filename.to_string());
            index.entries.push(IndexEntry {
                note_id,
                filename: filename.to_string(),
                title,
            });
        }
        index
    }

    #[must_use]
    pub fn filename(&self, id: &NoteId) -> Option<&str> {
        self.notes.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, id: &NoteId) -> bool {
        self.notes.contains_key(id)
    }

    /// Note links in page order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <h2>Cardiology</h2>
        <ul>
          <li><a href="notes/1_137_Atrial_fibrillation.html" target="_blank"><b>Atrial</b> fibrillation</a></li>
          <li><a href='1_140_Heart_failure.html'>Heart failure</a></li>
          <li><a href="#top">Back to top</a></li>
          <li><a href="https://example.org/about.html">About</a></li>
        </ul>
    "##;

    #[test]
    fn parses_note_links_and_ignores_others() {
        let index = TextbookIndex::parse(PAGE);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.filename(&NoteId::new("1_137")),
            Some("1_137_Atrial_fibrillation.html")
        );
        assert_eq!(
            index.filename(&NoteId::new("1_140")),
            Some("1_140_Heart_failure.html")
        );
        assert!(!index.contains(&NoteId::new("1_1")));
        let title = &index.entries()[0].title;
        assert!(title.contains("Atrial"), "{title}");
        assert!(title.ends_with("fibrillation"), "{title}");
        assert_eq!(index.entries()[1].title, "Heart failure");
    }

    #[test]
    fn patterns_compile() {
        assert!(ANCHOR.is_match(r#"<a href="1_2_x.html">x</a>"#));
        assert!(NOTE_FILE.is_match("1_2_x.html"));
        assert!(!NOTE_FILE.is_match("about.html"));
    }

    #[test]
    fn empty_page_yields_empty_index() {
        assert!(TextbookIndex::parse("<p>nothing here</p>").is_empty());
    }
}
