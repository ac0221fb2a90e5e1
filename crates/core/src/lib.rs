#![forbid(unsafe_code)]

pub mod evaluator;
pub mod model;

pub use evaluator::{
    AnswerInput, Evaluation, EvaluationError, Feedback, OptionFeedback, OptionMark, RankEntry,
    RankFeedback, evaluate, reveal,
};
