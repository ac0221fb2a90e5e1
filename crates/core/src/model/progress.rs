use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::model::exam_module::ExamModule;
use crate::model::ids::{CategoryId, QuestionId};
use crate::model::question::Question;

//
// ─── ANSWER STATUS ────────────────────────────────────────────────────────────
//

/// Outcome of the last submitted answer for a question.
///
/// Persisted as plain text. Text other than `correct` / `incorrect` is kept
/// verbatim so a stored value is never rewritten behind the user's back; such
/// a question still counts as answered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    Other(String),
}

impl AnswerStatus {
    #[must_use]
    pub fn from_correct(is_correct: bool) -> Self {
        if is_correct { Self::Correct } else { Self::Incorrect }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            AnswerStatus::Correct => "correct",
            AnswerStatus::Incorrect => "incorrect",
            AnswerStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for AnswerStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "correct" => Self::Correct,
            "incorrect" => Self::Incorrect,
            _ => Self::Other(raw),
        }
    }
}

impl From<AnswerStatus> for String {
    fn from(status: AnswerStatus) -> Self {
        match status {
            AnswerStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

//
// ─── PROGRESS RECORD ──────────────────────────────────────────────────────────
//

/// Durable per-question state. A record only exists once the question has
/// been answered or flagged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub status: Option<AnswerStatus>,
    #[serde(default)]
    pub flagged: bool,
}

impl ProgressRecord {
    #[must_use]
    pub fn new(status: Option<AnswerStatus>, flagged: bool) -> Self {
        Self { status, flagged }
    }
}

//
// ─── PROGRESS MAP ─────────────────────────────────────────────────────────────
//

/// All progress records of one exam module, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressMap {
    records: BTreeMap<QuestionId, ProgressRecord>,
}

impl ProgressMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&ProgressRecord> {
        self.records.get(id)
    }

    #[must_use]
    pub fn status(&self, id: &QuestionId) -> Option<AnswerStatus> {
        self.records.get(id).and_then(|r| r.status.clone())
    }

    #[must_use]
    pub fn is_flagged(&self, id: &QuestionId) -> bool {
        self.records.get(id).is_some_and(|r| r.flagged)
    }

    pub fn insert(&mut self, id: QuestionId, record: ProgressRecord) {
        self.records.insert(id, record);
    }

    /// Set the answer status on the existing-or-default record; the flag is
    /// left untouched.
    pub fn record_answer(&mut self, id: QuestionId, status: AnswerStatus) -> ProgressRecord {
        let record = self.records.entry(id).or_default();
        record.status = Some(status);
        record.clone()
    }

    /// Flip the flag on the existing-or-default record and return its new value.
    pub fn toggle_flag(&mut self, id: QuestionId) -> bool {
        let record = self.records.entry(id).or_default();
        record.flagged = !record.flagged;
        record.flagged
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, QuestionId, ProgressRecord> {
        self.records.iter()
    }

    /// Overall counts for the module.
    #[must_use]
    pub fn tally(&self, module: &ExamModule) -> ProgressTally {
        let mut tally = ProgressTally::default();
        for record in self.records.values() {
            match record.status {
                Some(AnswerStatus::Correct) => tally.correct += 1,
                Some(AnswerStatus::Incorrect) => tally.incorrect += 1,
                Some(AnswerStatus::Other(_)) | None => {}
            }
            if record.flagged {
                tally.flagged += 1;
            }
        }
        tally.remaining = module
            .total_questions()
            .saturating_sub(tally.correct + tally.incorrect);
        tally
    }

    /// Answered/total counts per category, in category order. Categories with
    /// no loaded questions are omitted.
    #[must_use]
    pub fn category_progress(
        &self,
        module: &ExamModule,
        questions: &[Question],
    ) -> Vec<CategoryProgress> {
        let mut counts: BTreeMap<CategoryId, (usize, usize)> = module
            .categories()
            .keys()
            .map(|id| (*id, (0, 0)))
            .collect();

        for question in questions {
            let Some((answered, total)) = counts.get_mut(&question.category()) else {
                continue;
            };
            *total += 1;
            if self.status(question.id()).is_some() {
                *answered += 1;
            }
        }

        counts
            .into_iter()
            .filter(|(_, (_, total))| *total > 0)
            .map(|(category, (answered, total))| CategoryProgress {
                category,
                name: module.category_name(category).unwrap_or_default().to_string(),
                answered,
                total,
            })
            .collect()
    }
}

impl FromIterator<(QuestionId, ProgressRecord)> for ProgressMap {
    fn from_iter<I: IntoIterator<Item = (QuestionId, ProgressRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

//
// ─── TALLIES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTally {
    pub correct: usize,
    pub incorrect: usize,
    pub flagged: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProgress {
    pub category: CategoryId,
    pub name: String,
    pub answered: usize,
    pub total: usize,
}

impl CategoryProgress {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f64 / self.total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::QuestionKind;

    fn question(id: &str, category: u32) -> Question {
        Question::new(
            QuestionId::new(id),
            CategoryId::new(category),
            QuestionKind::SingleBestAnswer,
            vec![String::new(), "x".into(), "y".into()],
            "1",
        )
    }

    #[test]
    fn record_answer_keeps_flag() {
        let mut map = ProgressMap::new();
        let id = QuestionId::new("q1");
        assert!(map.toggle_flag(id.clone()));
        let record = map.record_answer(id.clone(), AnswerStatus::Incorrect);
        assert_eq!(record, ProgressRecord::new(Some(AnswerStatus::Incorrect), true));
        assert!(map.is_flagged(&id));
    }

    #[test]
    fn toggle_flag_keeps_status() {
        let mut map = ProgressMap::new();
        let id = QuestionId::new("q1");
        map.record_answer(id.clone(), AnswerStatus::Correct);
        assert!(map.toggle_flag(id.clone()));
        assert!(!map.toggle_flag(id.clone()));
        assert_eq!(map.status(&id), Some(AnswerStatus::Correct));
    }

    #[test]
    fn serializes_flag_only_records_with_null_status() {
        let mut map = ProgressMap::new();
        map.toggle_flag(QuestionId::new("q9"));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"q9":{"status":null,"flagged":true}}"#);
    }

    #[test]
    fn unknown_status_text_round_trips() {
        let map: ProgressMap =
            serde_json::from_str(r#"{"q1":{"status":"skipped","flagged":false}}"#).unwrap();
        assert_eq!(
            map.status(&QuestionId::new("q1")),
            Some(AnswerStatus::Other("skipped".into()))
        );
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"q1":{"status":"skipped","flagged":false}}"#
        );
    }

    #[test]
    fn tally_counts_statuses_and_flags() {
        let module = ExamModule::pd();
        let mut map = ProgressMap::new();
        map.record_answer(QuestionId::new("a"), AnswerStatus::Correct);
        map.record_answer(QuestionId::new("b"), AnswerStatus::Incorrect);
        map.toggle_flag(QuestionId::new("b"));
        map.toggle_flag(QuestionId::new("c"));

        let tally = map.tally(&module);
        assert_eq!(tally.correct, 1);
        assert_eq!(tally.incorrect, 1);
        assert_eq!(tally.flagged, 2);
        assert_eq!(tally.remaining, 300);
    }

    #[test]
    fn category_progress_skips_empty_categories() {
        let module = ExamModule::msra();
        let questions = vec![question("a", 1), question("b", 1), question("c", 12)];
        let mut map = ProgressMap::new();
        map.record_answer(QuestionId::new("a"), AnswerStatus::Correct);
        map.toggle_flag(QuestionId::new("c"));

        let rows = map.category_progress(&module, &questions);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Cardiovascular");
        assert_eq!((rows[0].answered, rows[0].total), (1, 2));
        assert!((rows[0].percent() - 50.0).abs() < f64::EPSILON);
        assert_eq!((rows[1].answered, rows[1].total), (0, 1));
    }
}
