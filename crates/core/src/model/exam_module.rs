use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::ids::CategoryId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExamModuleError {
    #[error("unknown exam module: {0}")]
    Unknown(String),
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
}

//
// ─── EXAM MODULE ──────────────────────────────────────────────────────────────
//

/// Static description of one exam domain: where its questions and textbook
/// live, how many questions it has, and how they are batched on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamModule {
    key: String,
    total_questions: usize,
    batch_size: usize,
    questions_path: String,
    textbook_index_path: String,
    textbook_path: String,
    categories: BTreeMap<CategoryId, String>,
}

impl ExamModule {
    /// Build a custom module description.
    ///
    /// # Errors
    ///
    /// Returns `ExamModuleError::ZeroBatchSize` if `batch_size` is zero.
    pub fn new(
        key: impl Into<String>,
        total_questions: usize,
        batch_size: usize,
        questions_path: impl Into<String>,
        textbook_index_path: impl Into<String>,
        textbook_path: impl Into<String>,
        categories: impl IntoIterator<Item = (CategoryId, String)>,
    ) -> Result<Self, ExamModuleError> {
        if batch_size == 0 {
            return Err(ExamModuleError::ZeroBatchSize);
        }
        Ok(Self {
            key: key.into(),
            total_questions,
            batch_size,
            questions_path: questions_path.into(),
            textbook_index_path: textbook_index_path.into(),
            textbook_path: textbook_path.into(),
            categories: categories.into_iter().collect(),
        })
    }

    /// The MSRA clinical problem-solving bank.
    #[must_use]
    pub fn msra() -> Self {
        const NAMES: [&str; 12] = [
            "Cardiovascular",
            "Dermatology / ENT / Eyes",
            "Endocrinology / Metabolic",
            "Gastroenterology / Nutrition",
            "Infectious disease / Haematology / Immunology",
            "Musculoskeletal",
            "Paediatrics",
            "Pharmacology and therapeutics",
            "Psychiatry / Neurology",
            "Renal / Urology",
            "Reproductive",
            "Respiratory",
        ];
        Self {
            key: "msra".into(),
            total_questions: 2960,
            batch_size: 10,
            questions_path: "msra/questions/".into(),
            textbook_index_path: "msra/textbook.html".into(),
            textbook_path: "msra/textbook/".into(),
            categories: (1_u32..)
                .zip(NAMES)
                .map(|(id, name)| (CategoryId::new(id), name.to_string()))
                .collect(),
        }
    }

    /// The professional dilemmas (situational judgement) bank.
    #[must_use]
    pub fn pd() -> Self {
        Self {
            key: "pd".into(),
            total_questions: 302,
            batch_size: 10,
            questions_path: "professional_dilemma/questions/".into(),
            textbook_index_path: "professional_dilemma/textbook.html".into(),
            textbook_path: "professional_dilemma/textbook/".into(),
            categories: BTreeMap::from([(CategoryId::new(1), "Professional Dilemmas".to_string())]),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn textbook_index_path(&self) -> &str {
        &self.textbook_index_path
    }

    #[must_use]
    pub fn textbook_path(&self) -> &str {
        &self.textbook_path
    }

    #[must_use]
    pub fn categories(&self) -> &BTreeMap<CategoryId, String> {
        &self.categories
    }

    #[must_use]
    pub fn category_name(&self, id: CategoryId) -> Option<&str> {
        self.categories.get(&id).map(String::as_str)
    }

    /// Storage key under which this module's progress mapping is persisted.
    #[must_use]
    pub fn progress_key(&self) -> String {
        format!("progress_{}", self.key)
    }

    /// Number of batch files covering `[0, total_questions)`.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.total_questions.div_ceil(self.batch_size)
    }

    /// Inclusive `(start, end)` index ranges, one per batch, in order.
    #[must_use]
    pub fn batch_ranges(&self) -> Vec<(usize, usize)> {
        (0..self.batch_count())
            .map(|i| {
                let start = i * self.batch_size;
                let end = (start + self.batch_size - 1).min(self.total_questions - 1);
                (start, end)
            })
            .collect()
    }

    /// Path of the batch file covering `[start, end]`.
    #[must_use]
    pub fn batch_path(&self, start: usize, end: usize) -> String {
        format!("{}questions_{start}_to_{end}.json", self.questions_path)
    }

    /// Path of a textbook note file by filename.
    #[must_use]
    pub fn note_path(&self, filename: &str) -> String {
        format!("{}{filename}", self.textbook_path)
    }
}

impl fmt::Display for ExamModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl FromStr for ExamModule {
    type Err = ExamModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "msra" => Ok(Self::msra()),
            "pd" => Ok(Self::pd()),
            other => Err(ExamModuleError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(total: usize, batch: usize) -> ExamModule {
        ExamModule::new("t", total, batch, "t/q/", "t/idx.html", "t/notes/", []).unwrap()
    }

    #[test]
    fn batch_ranges_cover_total_with_short_tail() {
        let module = small(25, 10);
        assert_eq!(module.batch_count(), 3);
        assert_eq!(module.batch_ranges(), vec![(0, 9), (10, 19), (20, 24)]);
    }

    #[test]
    fn batch_paths_follow_naming_scheme() {
        let module = ExamModule::pd();
        let ranges = module.batch_ranges();
        assert_eq!(ranges.len(), 31);
        let (start, end) = ranges[30];
        assert_eq!(
            module.batch_path(start, end),
            "professional_dilemma/questions/questions_300_to_301.json"
        );
    }

    #[test]
    fn empty_module_has_no_batches() {
        assert!(small(0, 10).batch_ranges().is_empty());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = ExamModule::new("t", 5, 0, "", "", "", []).unwrap_err();
        assert_eq!(err, ExamModuleError::ZeroBatchSize);
    }

    #[test]
    fn builtin_catalogue_parses() {
        let msra: ExamModule = "msra".parse().unwrap();
        assert_eq!(msra.categories().len(), 12);
        assert_eq!(msra.category_name(CategoryId::new(12)), Some("Respiratory"));
        assert_eq!(msra.progress_key(), "progress_msra");
        assert!("nope".parse::<ExamModule>().is_err());
    }
}
