use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use quiz_core::model::{AnswerStatus, CategoryId, ProgressMap, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseFilterError {
    #[error("invalid quiz mode: {0} (expected all, unanswered, incorrect or flagged)")]
    Mode(String),
    #[error("invalid category: {0} (expected \"all\" or a category number)")]
    Category(String),
}

//
// ─── QUIZ MODE ────────────────────────────────────────────────────────────────
//

/// Which questions a quiz draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuizMode {
    #[default]
    All,
    Unanswered,
    Incorrect,
    /// Every flagged question in the module, regardless of category.
    Flagged,
}

impl QuizMode {
    /// User-facing message when the mode selects nothing.
    #[must_use]
    pub fn empty_message(self) -> &'static str {
        match self {
            QuizMode::All => "No questions found for this criteria.",
            QuizMode::Unanswered => "No unanswered questions remaining in this category!",
            QuizMode::Incorrect => "No incorrect questions found in this category.",
            QuizMode::Flagged => "You don't have any flagged questions.",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizMode::All => "all",
            QuizMode::Unanswered => "unanswered",
            QuizMode::Incorrect => "incorrect",
            QuizMode::Flagged => "flagged",
        }
    }

    /// Flagged quizzes ignore the category filter.
    #[must_use]
    pub fn uses_category(self) -> bool {
        !matches!(self, QuizMode::Flagged)
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizMode {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "unanswered" => Ok(Self::Unanswered),
            "incorrect" => Ok(Self::Incorrect),
            "flagged" => Ok(Self::Flagged),
            other => Err(ParseFilterError::Mode(other.to_string())),
        }
    }
}

//
// ─── CATEGORY FILTER ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(CategoryId),
}

impl CategoryFilter {
    #[must_use]
    pub fn matches(self, question: &Question) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(id) => question.category() == id,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "all" {
            return Ok(Self::All);
        }
        trimmed
            .parse::<CategoryId>()
            .map(Self::Only)
            .map_err(|_| ParseFilterError::Category(trimmed.to_string()))
    }
}

//
// ─── SELECTION ────────────────────────────────────────────────────────────────
//

/// Indices into `questions` that a quiz with these filters draws from, in
/// source order.
#[must_use]
pub fn select_questions(
    questions: &[Question],
    progress: &ProgressMap,
    category: CategoryFilter,
    mode: QuizMode,
) -> Vec<usize> {
    questions
        .iter()
        .enumerate()
        .filter(|(_, q)| !mode.uses_category() || category.matches(q))
        .filter(|(_, q)| match mode {
            QuizMode::All => true,
            QuizMode::Unanswered => progress.status(q.id()).is_none(),
            QuizMode::Incorrect => progress.status(q.id()) == Some(AnswerStatus::Incorrect),
            QuizMode::Flagged => progress.is_flagged(q.id()),
        })
        .map(|(index, _)| index)
        .collect()
}
