use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use quiz_core::model::{AnswerStatus, ExamModule, ProgressMap, ProgressRecord, QuestionId};
use quiz_core::{AnswerInput, Evaluation, evaluate};
use storage::{Persisted, ProgressError, ProgressStore};

use super::filter::{CategoryFilter, QuizMode};
use super::progress::ProgressOverview;
use super::session::QuizSession;
use crate::error::SessionError;
use crate::question_store::QuestionStore;

/// Result of submitting an answer for the current question.
#[derive(Debug)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub evaluation: Evaluation,
    pub record: ProgressRecord,
    /// Set when the answer was recorded in memory but could not be saved.
    pub save_error: Option<ProgressError>,
}

impl AnswerOutcome {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.evaluation.is_correct
    }
}

/// Orchestrates quiz start, answering, and flagging over shared stores.
#[derive(Clone)]
pub struct QuizService {
    questions: Arc<QuestionStore>,
    progress: ProgressStore,
}

impl QuizService {
    #[must_use]
    pub fn new(questions: Arc<QuestionStore>, progress: ProgressStore) -> Self {
        Self {
            questions,
            progress,
        }
    }

    #[must_use]
    pub fn question_store(&self) -> &QuestionStore {
        &self.questions
    }

    /// Load the persisted progress mapping for `module`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress` if the backend cannot be read.
    pub async fn load_progress(&self, module: &ExamModule) -> Result<ProgressMap, SessionError> {
        Ok(self.progress.load(module).await?)
    }

    /// Start a quiz with a thread-local random shuffle.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` if questions cannot be fetched and
    /// `SessionError::Empty` if the filters select nothing.
    pub async fn start_quiz(
        &self,
        module: &ExamModule,
        progress: &ProgressMap,
        category: CategoryFilter,
        mode: QuizMode,
    ) -> Result<QuizSession, SessionError> {
        // Seeded up front so no thread-local handle is held across the load.
        let mut rng = StdRng::from_rng(&mut rand::rng());
        self.start_quiz_with_rng(module, progress, category, mode, &mut rng)
            .await
    }

    /// Start a quiz shuffled by `rng`.
    ///
    /// # Errors
    ///
    /// Same as [`QuizService::start_quiz`].
    pub async fn start_quiz_with_rng<R: Rng + ?Sized>(
        &self,
        module: &ExamModule,
        progress: &ProgressMap,
        category: CategoryFilter,
        mode: QuizMode,
        rng: &mut R,
    ) -> Result<QuizSession, SessionError> {
        let questions = self.questions.load_all(module).await?;
        let session = QuizSession::build(module.clone(), questions, progress, category, mode, rng)?;
        info!(module = %module, %category, %mode, count = session.len(), "quiz started");
        Ok(session)
    }

    /// Evaluate `input` against the session's current question and record the
    /// outcome. The flag on the question is preserved.
    ///
    /// A failed save leaves the in-memory record updated and is returned in
    /// `AnswerOutcome::save_error`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Evaluation` if the question type is unknown or
    /// `input` does not match it. Nothing is recorded in that case.
    pub async fn submit_answer(
        &self,
        session: &QuizSession,
        progress: &mut ProgressMap,
        input: &AnswerInput,
    ) -> Result<AnswerOutcome, SessionError> {
        let question = session.current();
        let evaluation = evaluate(question, input)?;
        let status = AnswerStatus::from_correct(evaluation.is_correct);
        debug!(question = %question.id(), status = status.as_str(), "answer evaluated");

        let Persisted { value, save_error } = self
            .progress
            .record_answer(session.module(), progress, question.id(), status)
            .await;

        Ok(AnswerOutcome {
            question_id: question.id().clone(),
            evaluation,
            record: value,
            save_error,
        })
    }

    /// Flip the flag on the session's current question.
    pub async fn toggle_flag(
        &self,
        session: &QuizSession,
        progress: &mut ProgressMap,
    ) -> Persisted<bool> {
        let id = session.current().id();
        let persisted = self
            .progress
            .toggle_flag(session.module(), progress, id)
            .await;
        debug!(question = %id, flagged = persisted.value, "flag toggled");
        persisted
    }

    /// Overall and per-category progress for `module`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` if questions cannot be fetched.
    pub async fn overview(
        &self,
        module: &ExamModule,
        progress: &ProgressMap,
    ) -> Result<ProgressOverview, SessionError> {
        let questions = self.questions.load_all(module).await?;
        Ok(ProgressOverview::build(module, progress, &questions))
    }
}
