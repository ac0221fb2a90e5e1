//! Answer checking for every question grammar.
//!
//! Evaluation is pure: it takes a question and the raw user input and returns
//! whether the answer is right plus per-option feedback. Recording the outcome
//! in the progress map is the caller's job.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::{Question, QuestionKind, QuestionKindError};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error(transparent)]
    UnknownQuestionType(#[from] QuestionKindError),
    #[error("answer input does not match a {expected:?} question")]
    InputMismatch { expected: QuestionKind },
}

//
// ─── INPUT ────────────────────────────────────────────────────────────────────
//

/// One rank typed by the user next to an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub letter: char,
    /// Text as entered; it is parsed leniently.
    pub raw: String,
}

impl RankEntry {
    #[must_use]
    pub fn new(letter: char, raw: impl Into<String>) -> Self {
        Self {
            letter,
            raw: raw.into(),
        }
    }
}

/// Raw user input, shaped by question kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    /// Chosen 1-based option index, if any was chosen.
    Single(Option<u32>),
    /// Ranks in option order.
    Ranking(Vec<RankEntry>),
    /// Chosen option letters.
    Multiple(BTreeSet<char>),
}

//
// ─── FEEDBACK ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Correct,
    Incorrect,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionFeedback {
    pub index: u32,
    pub letter: char,
    pub selected: bool,
    pub mark: OptionMark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankFeedback {
    pub letter: char,
    pub entered: String,
    /// 1-based rank in the correct ordering, 0 if the letter is absent from it.
    pub correct_rank: usize,
    pub valid: bool,
}

impl RankFeedback {
    /// Hint shown next to an invalid rank.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        (!self.valid).then(|| format!("(Correct: {})", self.correct_rank))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Options(Vec<OptionFeedback>),
    Ranks(Vec<RankFeedback>),
}

/// Result of checking an answer. All inputs are locked once evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub is_correct: bool,
    pub feedback: Feedback,
}

//
// ─── EVALUATION ───────────────────────────────────────────────────────────────
//

/// Check `input` against `question`.
///
/// # Errors
///
/// Returns `EvaluationError::UnknownQuestionType` if the question type code is
/// not recognized, and `EvaluationError::InputMismatch` if the input shape does
/// not belong to the question's kind.
pub fn evaluate(question: &Question, input: &AnswerInput) -> Result<Evaluation, EvaluationError> {
    let kind = question.kind()?;
    match (kind, input) {
        (QuestionKind::SingleBestAnswer, AnswerInput::Single(chosen)) => {
            Ok(evaluate_single(question, *chosen))
        }
        (QuestionKind::Ranking, AnswerInput::Ranking(entries)) => {
            Ok(evaluate_ranking(question, entries))
        }
        (QuestionKind::SelectMultiple(_), AnswerInput::Multiple(chosen)) => {
            Ok(evaluate_multiple(question, chosen))
        }
        (expected, _) => Err(EvaluationError::InputMismatch { expected }),
    }
}

/// Feedback for a question that was already answered: the correct answer is
/// shown, no user selection is restored.
///
/// # Errors
///
/// Returns `EvaluationError::UnknownQuestionType` if the type code is unknown.
pub fn reveal(question: &Question) -> Result<Feedback, EvaluationError> {
    let feedback = match question.kind()? {
        QuestionKind::SingleBestAnswer => Feedback::Options(
            question
                .active_options()
                .map(|slot| OptionFeedback {
                    index: slot.index,
                    letter: slot.letter,
                    selected: false,
                    mark: if index_matches(slot.index, question.correct_answer()) {
                        OptionMark::Correct
                    } else {
                        OptionMark::Neutral
                    },
                })
                .collect(),
        ),
        QuestionKind::Ranking => Feedback::Ranks(
            question
                .active_options()
                .map(|slot| {
                    let correct_rank = correct_rank(question.correct_answer(), slot.letter);
                    RankFeedback {
                        letter: slot.letter,
                        entered: correct_rank.to_string(),
                        correct_rank,
                        valid: true,
                    }
                })
                .collect(),
        ),
        QuestionKind::SelectMultiple(_) => {
            let correct: BTreeSet<char> = question.correct_answer().chars().collect();
            Feedback::Options(
                question
                    .active_options()
                    .map(|slot| OptionFeedback {
                        index: slot.index,
                        letter: slot.letter,
                        selected: false,
                        mark: if correct.contains(&slot.letter) {
                            OptionMark::Correct
                        } else {
                            OptionMark::Neutral
                        },
                    })
                    .collect(),
            )
        }
    };
    Ok(feedback)
}

fn evaluate_single(question: &Question, chosen: Option<u32>) -> Evaluation {
    let correct_answer = question.correct_answer();
    let is_correct = chosen.is_some_and(|index| index_matches(index, correct_answer));

    let feedback = question
        .active_options()
        .map(|slot| {
            let selected = chosen == Some(slot.index);
            let mark = if index_matches(slot.index, correct_answer) {
                OptionMark::Correct
            } else if selected {
                OptionMark::Incorrect
            } else {
                OptionMark::Neutral
            };
            OptionFeedback {
                index: slot.index,
                letter: slot.letter,
                selected,
                mark,
            }
        })
        .collect();

    Evaluation {
        is_correct,
        feedback: Feedback::Options(feedback),
    }
}

fn evaluate_ranking(question: &Question, entries: &[RankEntry]) -> Evaluation {
    let correct_answer = question.correct_answer();

    let mut ordered: Vec<(u32, char)> = entries
        .iter()
        .map(|entry| (lenient_rank(&entry.raw), entry.letter))
        .collect();
    // Stable: equal ranks keep input order.
    ordered.sort_by_key(|(rank, _)| *rank);
    let derived: String = ordered.iter().map(|(_, letter)| *letter).collect();
    let is_correct = derived == correct_answer;

    let feedback = entries
        .iter()
        .map(|entry| {
            let correct_rank = correct_rank(correct_answer, entry.letter);
            RankFeedback {
                letter: entry.letter,
                entered: entry.raw.clone(),
                correct_rank,
                valid: entry.raw.trim() == correct_rank.to_string(),
            }
        })
        .collect();

    Evaluation {
        is_correct,
        feedback: Feedback::Ranks(feedback),
    }
}

fn evaluate_multiple(question: &Question, chosen: &BTreeSet<char>) -> Evaluation {
    let chosen: BTreeSet<char> = chosen.iter().map(char::to_ascii_uppercase).collect();
    let correct: BTreeSet<char> = question.correct_answer().chars().collect();

    let chosen_key: String = chosen.iter().collect();
    let mut correct_key: Vec<char> = question.correct_answer().chars().collect();
    correct_key.sort_unstable();
    let is_correct = chosen_key == correct_key.into_iter().collect::<String>();

    let feedback = question
        .active_options()
        .map(|slot| {
            let selected = chosen.contains(&slot.letter);
            let mark = if correct.contains(&slot.letter) {
                OptionMark::Correct
            } else if selected {
                OptionMark::Incorrect
            } else {
                OptionMark::Neutral
            };
            OptionFeedback {
                index: slot.index,
                letter: slot.letter,
                selected,
                mark,
            }
        })
        .collect();

    Evaluation {
        is_correct,
        feedback: Feedback::Options(feedback),
    }
}

/// Compare an option index with the stored answer, tolerating either a
/// numeric or a textual encoding of the answer.
fn index_matches(index: u32, correct_answer: &str) -> bool {
    let trimmed = correct_answer.trim();
    match trimmed.parse::<u32>() {
        Ok(value) => value == index,
        Err(_) => trimmed == index.to_string(),
    }
}

fn correct_rank(correct_answer: &str, letter: char) -> usize {
    correct_answer
        .chars()
        .position(|c| c == letter)
        .map_or(0, |pos| pos + 1)
}

/// Leading digits of the trimmed text; anything unparseable ranks as 0.
fn lenient_rank(raw: &str) -> u32 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryId, QuestionId};

    fn options(texts: &[&str]) -> Vec<String> {
        std::iter::once(String::new())
            .chain(texts.iter().map(|t| (*t).to_string()))
            .collect()
    }

    fn sba(correct: &str) -> Question {
        Question::new(
            QuestionId::new("sba"),
            CategoryId::new(1),
            QuestionKind::SingleBestAnswer,
            options(&["A", "B", "C"]),
            correct,
        )
    }

    fn ranking(correct: &str) -> Question {
        Question::new(
            QuestionId::new("rank"),
            CategoryId::new(1),
            QuestionKind::Ranking,
            options(&["first", "second", "third"]),
            correct,
        )
    }

    fn multiple(correct: &str) -> Question {
        Question::new(
            QuestionId::new("multi"),
            CategoryId::new(1),
            QuestionKind::SelectMultiple(2),
            options(&["a", "b", "c", "d"]),
            correct,
        )
    }

    fn ranks(pairs: &[(char, &str)]) -> AnswerInput {
        AnswerInput::Ranking(pairs.iter().map(|(l, r)| RankEntry::new(*l, *r)).collect())
    }

    fn letters(chosen: &str) -> AnswerInput {
        AnswerInput::Multiple(chosen.chars().collect())
    }

    #[test]
    fn single_best_answer_matches_index() {
        let q = sba("2");
        assert!(evaluate(&q, &AnswerInput::Single(Some(2))).unwrap().is_correct);
        assert!(!evaluate(&q, &AnswerInput::Single(Some(1))).unwrap().is_correct);
        assert!(!evaluate(&q, &AnswerInput::Single(Some(3))).unwrap().is_correct);
        assert!(!evaluate(&q, &AnswerInput::Single(None)).unwrap().is_correct);
    }

    #[test]
    fn single_best_answer_tolerates_padded_answer() {
        let q = sba(" 2 ");
        assert!(evaluate(&q, &AnswerInput::Single(Some(2))).unwrap().is_correct);
    }

    #[test]
    fn single_best_answer_feedback_marks_correct_and_selected() {
        let q = sba("2");
        let eval = evaluate(&q, &AnswerInput::Single(Some(3))).unwrap();
        let Feedback::Options(marks) = eval.feedback else {
            panic!("expected option feedback");
        };
        let by_index: Vec<_> = marks.iter().map(|m| (m.index, m.mark)).collect();
        assert_eq!(
            by_index,
            vec![
                (1, OptionMark::Neutral),
                (2, OptionMark::Correct),
                (3, OptionMark::Incorrect),
            ]
        );
    }

    #[test]
    fn ranking_derives_order_from_entered_ranks() {
        let input = ranks(&[('A', "2"), ('B', "1"), ('C', "3")]);
        assert!(evaluate(&ranking("BAC"), &input).unwrap().is_correct);
        assert!(!evaluate(&ranking("ABC"), &input).unwrap().is_correct);
    }

    #[test]
    fn ranking_ties_keep_input_order() {
        let input = ranks(&[('A', "1"), ('B', "1"), ('C', "")]);
        // C parses as 0 and sorts first; A and B tie and keep their order.
        assert!(evaluate(&ranking("CAB"), &input).unwrap().is_correct);
    }

    #[test]
    fn ranking_feedback_hints_correct_rank() {
        let eval = evaluate(&ranking("BAC"), &ranks(&[('A', "1"), ('B', "2"), ('C', "3")])).unwrap();
        assert!(!eval.is_correct);
        let Feedback::Ranks(ranks) = eval.feedback else {
            panic!("expected rank feedback");
        };
        assert!(!ranks[0].valid);
        assert_eq!(ranks[0].hint().as_deref(), Some("(Correct: 2)"));
        assert!(!ranks[1].valid);
        assert_eq!(ranks[1].correct_rank, 1);
        assert!(ranks[2].valid);
        assert_eq!(ranks[2].hint(), None);
    }

    #[test]
    fn ranking_all_valid_inputs_imply_correct() {
        let correct_orders = ["ABC", "ACB", "BAC", "BCA", "CAB", "CBA"];
        for correct in correct_orders {
            let q = ranking(correct);
            let entries: Vec<(char, String)> = ['A', 'B', 'C']
                .into_iter()
                .map(|l| (l, (correct.find(l).unwrap() + 1).to_string()))
                .collect();
            let input = AnswerInput::Ranking(
                entries.iter().map(|(l, r)| RankEntry::new(*l, r.clone())).collect(),
            );
            let eval = evaluate(&q, &input).unwrap();
            let Feedback::Ranks(ranks) = &eval.feedback else {
                panic!("expected rank feedback");
            };
            assert!(ranks.iter().all(|r| r.valid));
            assert!(eval.is_correct, "order {correct}");
        }
    }

    #[test]
    fn select_multiple_ignores_order() {
        let q = multiple("AC");
        assert!(evaluate(&q, &letters("CA")).unwrap().is_correct);
        assert!(!evaluate(&q, &letters("AB")).unwrap().is_correct);
        assert!(!evaluate(&q, &letters("ACD")).unwrap().is_correct);
    }

    #[test]
    fn select_multiple_handles_unsorted_answer_key() {
        let q = multiple("CA");
        assert!(evaluate(&q, &letters("AC")).unwrap().is_correct);
    }

    #[test]
    fn select_multiple_feedback() {
        let eval = evaluate(&multiple("AC"), &letters("AB")).unwrap();
        let Feedback::Options(marks) = eval.feedback else {
            panic!("expected option feedback");
        };
        let by_letter: Vec<_> = marks.iter().map(|m| (m.letter, m.mark)).collect();
        assert_eq!(
            by_letter,
            vec![
                ('A', OptionMark::Correct),
                ('B', OptionMark::Incorrect),
                ('C', OptionMark::Correct),
                ('D', OptionMark::Neutral),
            ]
        );
    }

    #[test]
    fn unknown_type_is_refused() {
        let q = Question::with_type_code(
            QuestionId::new("odd"),
            CategoryId::new(1),
            "7",
            options(&["a"]),
            "1",
        );
        let err = evaluate(&q, &AnswerInput::Single(Some(1))).unwrap_err();
        assert!(matches!(err, EvaluationError::UnknownQuestionType(_)));
        assert!(reveal(&q).is_err());
    }

    #[test]
    fn mismatched_input_is_refused() {
        let err = evaluate(&sba("1"), &letters("A")).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::InputMismatch {
                expected: QuestionKind::SingleBestAnswer
            }
        );
    }

    #[test]
    fn reveal_shows_correct_ranks() {
        let Feedback::Ranks(ranks) = reveal(&ranking("CAB")).unwrap() else {
            panic!("expected rank feedback");
        };
        let entered: Vec<_> = ranks.iter().map(|r| r.entered.as_str()).collect();
        assert_eq!(entered, vec!["2", "3", "1"]);
    }
}
