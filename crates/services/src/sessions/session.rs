use std::fmt;
use std::sync::Arc;

use rand::Rng;

use quiz_core::model::{AnswerStatus, ExamModule, ProgressMap, Question, QuestionId};

use super::filter::{CategoryFilter, QuizMode, select_questions};
use super::shuffle::fisher_yates;
use crate::error::SessionError;

//
// ─── NAVIGATION ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// One row of the question list shown beside the quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionListEntry {
    pub index: usize,
    pub question_id: QuestionId,
    pub status: Option<AnswerStatus>,
    pub flagged: bool,
    pub active: bool,
}

impl QuestionListEntry {
    #[must_use]
    pub fn label(&self) -> String {
        format!("Question {}", self.index + 1)
    }
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// An in-progress quiz over a fixed, shuffled working set.
///
/// The session shares the module's loaded questions and stores only the
/// shuffled indices into them plus the current position. The working set is
/// never empty, so `current` is always defined.
pub struct QuizSession {
    module: ExamModule,
    category: CategoryFilter,
    mode: QuizMode,
    questions: Arc<[Question]>,
    order: Vec<usize>,
    position: usize,
}

impl QuizSession {
    /// Filter `questions` and fix a shuffled working set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` with the requested mode if the filters
    /// select no questions.
    pub fn build<R: Rng + ?Sized>(
        module: ExamModule,
        questions: Arc<[Question]>,
        progress: &ProgressMap,
        category: CategoryFilter,
        mode: QuizMode,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let mut order = select_questions(&questions, progress, category, mode);
        if order.is_empty() {
            return Err(SessionError::Empty { mode });
        }
        fisher_yates(&mut order, rng);

        Ok(Self {
            module,
            category,
            mode,
            questions,
            order,
            position: 0,
        })
    }

    #[must_use]
    pub fn module(&self) -> &ExamModule {
        &self.module
    }

    #[must_use]
    pub fn category(&self) -> CategoryFilter {
        self.category
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of questions in the working set (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn current(&self) -> &Question {
        &self.questions[self.order[self.position]]
    }

    #[must_use]
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.order.get(index).map(|i| &self.questions[*i])
    }

    /// Working-set questions in session order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.order.iter().map(|i| &self.questions[*i])
    }

    /// Move one step, clamped to the working set. Returns the new position.
    pub fn advance(&mut self, direction: Direction) -> usize {
        let target = match direction {
            Direction::Next => self.position.saturating_add(1),
            Direction::Prev => self.position.saturating_sub(1),
        };
        self.jump_to(target)
    }

    /// Move to `index`, clamped to the working set. Returns the new position.
    pub fn jump_to(&mut self, index: usize) -> usize {
        self.position = index.min(self.order.len().saturating_sub(1));
        self.position
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.position > 0
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.position + 1 < self.order.len()
    }

    #[must_use]
    pub fn nav_label(&self) -> String {
        format!("Question {} / {}", self.position + 1, self.order.len())
    }

    /// Session-ordered list rows reflecting current progress.
    #[must_use]
    pub fn question_list(&self, progress: &ProgressMap) -> Vec<QuestionListEntry> {
        self.questions()
            .enumerate()
            .map(|(index, q)| QuestionListEntry {
                index,
                question_id: q.id().clone(),
                status: progress.status(q.id()),
                flagged: progress.is_flagged(q.id()),
                active: index == self.position,
            })
            .collect()
    }

    /// Position of `id` within the working set, if present.
    #[must_use]
    pub fn index_of(&self, id: &QuestionId) -> Option<usize> {
        self.questions().position(|q| q.id() == id)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("module", &self.module.key())
            .field("category", &self.category)
            .field("mode", &self.mode)
            .field("len", &self.order.len())
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
