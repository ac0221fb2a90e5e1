use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::model::ids::{CategoryId, LooseText, NoteId, QuestionId, loose_optional_string, loose_string};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionKindError {
    #[error("unknown question type \"{0}\"")]
    UnknownQuestionType(String),
}

//
// ─── QUESTION KIND ────────────────────────────────────────────────────────────
//

/// How a question is answered and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Pick exactly one option.
    SingleBestAnswer,
    /// Put every option in order.
    Ranking,
    /// Pick exactly `k` options.
    SelectMultiple(u8),
}

impl QuestionKind {
    /// Map a question-type code from the batch files.
    ///
    /// # Errors
    ///
    /// Returns `QuestionKindError::UnknownQuestionType` for unrecognized codes.
    pub fn from_code(code: &str) -> Result<Self, QuestionKindError> {
        match code.trim() {
            "0" => Ok(Self::SingleBestAnswer),
            "2" => Ok(Self::Ranking),
            "3" => Ok(Self::SelectMultiple(3)),
            "5" => Ok(Self::SelectMultiple(2)),
            other => Err(QuestionKindError::UnknownQuestionType(other.to_string())),
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            QuestionKind::SingleBestAnswer => "0",
            QuestionKind::Ranking => "2",
            QuestionKind::SelectMultiple(2) => "5",
            QuestionKind::SelectMultiple(_) => "3",
        }
    }
}

//
// ─── OPTIONS ──────────────────────────────────────────────────────────────────
//

/// One active answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSlot<'a> {
    /// 1-based position into the question's option list.
    pub index: u32,
    /// Stable letter label (`A`, `B`, ...).
    pub letter: char,
    pub text: &'a str,
}

/// Letter label for the zero-based position among active options.
#[must_use]
pub fn option_letter(position: usize) -> Option<char> {
    u8::try_from(position)
        .ok()
        .filter(|p| *p < 26)
        .map(|p| char::from(b'A' + p))
}

// Note links that exist in the data but point nowhere.
const NOTE_LINK_SENTINELS: [&str; 2] = ["0", "1_1827"];

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// An immutable exam question as stored in the batch files.
///
/// `options[0]` is a placeholder; real options start at index 1 and the
/// first `option_count` of them are active.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    #[serde(rename = "question_id")]
    id: QuestionId,
    category: CategoryId,
    #[serde(rename = "question_type", deserialize_with = "loose_string")]
    type_code: String,
    #[serde(rename = "question", default, deserialize_with = "loose_string")]
    prompt: String,
    #[serde(default, deserialize_with = "option_texts")]
    options: Vec<String>,
    #[serde(rename = "num_of_options", default, deserialize_with = "loose_count")]
    option_count: Option<usize>,
    #[serde(rename = "correct_answer", default, deserialize_with = "loose_string")]
    correct_answer: String,
    #[serde(rename = "question_notes", default, deserialize_with = "loose_string")]
    explanation: String,
    #[serde(rename = "notes_id_link", default, deserialize_with = "loose_optional_string")]
    linked_note: Option<String>,
}

impl Question {
    /// Build a question in memory. `options` includes the leading placeholder.
    #[must_use]
    pub fn new(
        id: QuestionId,
        category: CategoryId,
        kind: QuestionKind,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self::with_type_code(id, category, kind.code(), options, correct_answer)
    }

    /// Same as `new` but with a raw type code, which may be unknown.
    #[must_use]
    pub fn with_type_code(
        id: QuestionId,
        category: CategoryId,
        type_code: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id,
            category,
            type_code: type_code.into(),
            prompt: String::new(),
            option_count: Some(options.len().saturating_sub(1)),
            options,
            correct_answer: correct_answer.into(),
            explanation: String::new(),
            linked_note: None,
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    #[must_use]
    pub fn with_linked_note(mut self, note: impl Into<String>) -> Self {
        self.linked_note = Some(note.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn category(&self) -> CategoryId {
        self.category
    }

    #[must_use]
    pub fn type_code(&self) -> &str {
        &self.type_code
    }

    /// Resolve the answer grammar for this question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionKindError::UnknownQuestionType` when the stored code is
    /// not one of the known question types.
    pub fn kind(&self) -> Result<QuestionKind, QuestionKindError> {
        QuestionKind::from_code(&self.type_code)
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Prompt markup with line breaks normalized and `<q>` quotes turned into
    /// block quotes.
    #[must_use]
    pub fn prompt_html(&self) -> String {
        self.prompt
            .replace("<br />", "<br>")
            .replace(
                "<q>",
                "<blockquote class=\"border-start border-4 border-secondary ps-3 my-3 text-secondary\">",
            )
            .replace("</q>", "</blockquote>")
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Number of active options counted from index 1.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.option_count
            .unwrap_or_else(|| self.options.len().saturating_sub(1))
    }

    /// Active options with their 1-based index and letter label. Empty option
    /// texts are skipped but keep their letter slot.
    pub fn active_options(&self) -> impl Iterator<Item = OptionSlot<'_>> {
        self.options
            .iter()
            .skip(1)
            .take(self.option_count())
            .enumerate()
            .filter(|(_, text)| !text.is_empty())
            .filter_map(|(pos, text)| {
                let letter = option_letter(pos)?;
                let index = u32::try_from(pos + 1).ok()?;
                Some(OptionSlot {
                    index,
                    letter,
                    text: text.as_str(),
                })
            })
    }

    /// Linked textbook note, if the link points at a real note.
    #[must_use]
    pub fn linked_note(&self) -> Option<NoteId> {
        self.linked_note
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty() && !NOTE_LINK_SENTINELS.contains(link))
            .map(NoteId::new)
    }
}

fn option_texts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Vec::<Option<LooseText>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|slot| slot.map(LooseText::into_string).unwrap_or_default())
        .collect())
}

fn loose_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let raw = Option::<LooseText>::deserialize(deserializer)?;
    match raw.map(LooseText::into_string) {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => text
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
