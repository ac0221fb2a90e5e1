use quiz_core::model::{CategoryProgress, ExamModule, ProgressMap, ProgressTally, Question};

/// Aggregated view of module progress, useful for UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOverview {
    pub tally: ProgressTally,
    pub categories: Vec<CategoryProgress>,
}

impl ProgressOverview {
    #[must_use]
    pub fn build(module: &ExamModule, progress: &ProgressMap, questions: &[Question]) -> Self {
        Self {
            tally: progress.tally(module),
            categories: progress.category_progress(module, questions),
        }
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.tally.correct + self.tally.incorrect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerStatus, CategoryId, QuestionId, QuestionKind};

    #[test]
    fn overview_counts_answered_and_remaining() {
        let module = ExamModule::pd();
        let questions = vec![
            Question::new(
                QuestionId::new("1"),
                CategoryId::new(1),
                QuestionKind::Ranking,
                vec![String::new(), "a".into()],
                "A",
            ),
            Question::new(
                QuestionId::new("2"),
                CategoryId::new(1),
                QuestionKind::Ranking,
                vec![String::new(), "a".into()],
                "A",
            ),
        ];
        let mut progress = ProgressMap::new();
        progress.record_answer(QuestionId::new("1"), AnswerStatus::Incorrect);
        progress.toggle_flag(QuestionId::new("2"));

        let overview = ProgressOverview::build(&module, &progress, &questions);
        assert_eq!(overview.answered(), 1);
        assert_eq!(overview.tally.flagged, 1);
        assert_eq!(overview.tally.remaining, module.total_questions() - 1);
        assert_eq!(overview.categories.len(), 1);
        assert_eq!(overview.categories[0].answered, 1);
        assert_eq!(overview.categories[0].total, 2);
    }
}
