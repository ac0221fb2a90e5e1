//! Line-oriented terminal front end for a quiz session.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use quiz_core::model::{AnswerStatus, ExamModule, ProgressMap, Question, QuestionKind};
use quiz_core::{AnswerInput, Feedback, OptionMark, RankEntry, reveal};
use services::textbook::plain_text;
use services::{
    Direction, ProgressOverview, QuizService, QuizSession, SessionError, TextbookError,
    TextbookService,
};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
pub enum TerminalError {
    Io(std::io::Error),
    Session(SessionError),
    Textbook(TextbookError),
    UnknownEntry(String),
}

impl fmt::Display for TerminalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalError::Io(err) => write!(f, "terminal i/o failed: {err}"),
            TerminalError::Session(err) => write!(f, "{err}"),
            TerminalError::Textbook(err) => write!(f, "{err}"),
            TerminalError::UnknownEntry(raw) => {
                write!(f, "no textbook entry {raw} (run `textbook` to list them)")
            }
        }
    }
}

impl std::error::Error for TerminalError {}

impl From<std::io::Error> for TerminalError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SessionError> for TerminalError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<TextbookError> for TerminalError {
    fn from(err: TextbookError) -> Self {
        Self::Textbook(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidPosition(String),
    InvalidAnswer(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::UnknownCommand(raw) => write!(f, "unknown command: {raw} (h for help)"),
            InputError::MissingArgument(cmd) => write!(f, "{cmd} requires a value"),
            InputError::InvalidPosition(raw) => write!(f, "not a question number: {raw}"),
            InputError::InvalidAnswer(reason) => write!(f, "invalid answer: {reason}"),
        }
    }
}

//
// ─── COMMANDS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Next,
    Prev,
    /// 0-based target position.
    Jump(usize),
    Flag,
    Submit(String),
    List,
    Note,
    Help,
    Quit,
}

impl TerminalCommand {
    /// Parse one input line.
    ///
    /// # Errors
    ///
    /// Returns `InputError` for unknown commands or malformed arguments.
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(head, rest)| (head, rest.trim()));

        match head {
            "n" | "next" => Ok(Self::Next),
            "p" | "prev" => Ok(Self::Prev),
            "g" | "go" => {
                if rest.is_empty() {
                    return Err(InputError::MissingArgument("g"));
                }
                match rest.parse::<usize>() {
                    Ok(number) if number > 0 => Ok(Self::Jump(number - 1)),
                    _ => Err(InputError::InvalidPosition(rest.to_string())),
                }
            }
            "f" | "flag" => Ok(Self::Flag),
            "s" | "submit" => {
                if rest.is_empty() {
                    return Err(InputError::MissingArgument("s"));
                }
                Ok(Self::Submit(rest.to_string()))
            }
            "l" | "list" => Ok(Self::List),
            "note" => Ok(Self::Note),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" => Ok(Self::Quit),
            other => Err(InputError::UnknownCommand(other.to_string())),
        }
    }
}

/// Turn the text after `s` into answer input for `question`.
///
/// Single best answer takes an option letter or number, ranking takes one
/// rank per option in letter order, select-multiple takes a set of letters.
///
/// # Errors
///
/// Returns `InputError::InvalidAnswer` if the text does not fit the
/// question kind.
pub fn parse_answer(question: &Question, raw: &str) -> Result<AnswerInput, InputError> {
    let kind = question
        .kind()
        .map_err(|err| InputError::InvalidAnswer(err.to_string()))?;

    match kind {
        QuestionKind::SingleBestAnswer => {
            let choice = raw.trim();
            let slot = if let Ok(index) = choice.parse::<u32>() {
                question.active_options().find(|slot| slot.index == index)
            } else {
                let letter = single_letter(choice).ok_or_else(|| {
                    InputError::InvalidAnswer(format!("expected one option, got {choice}"))
                })?;
                question.active_options().find(|slot| slot.letter == letter)
            };
            slot.map(|slot| AnswerInput::Single(Some(slot.index)))
                .ok_or_else(|| InputError::InvalidAnswer(format!("no option {choice}")))
        }
        QuestionKind::Ranking => {
            let letters: Vec<char> = question.active_options().map(|slot| slot.letter).collect();
            let ranks: Vec<&str> = raw
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|token| !token.is_empty())
                .collect();
            if ranks.len() > letters.len() {
                return Err(InputError::InvalidAnswer(format!(
                    "expected at most {} ranks",
                    letters.len()
                )));
            }
            Ok(AnswerInput::Ranking(
                letters
                    .iter()
                    .enumerate()
                    .map(|(i, letter)| RankEntry::new(*letter, ranks.get(i).copied().unwrap_or("")))
                    .collect(),
            ))
        }
        QuestionKind::SelectMultiple(_) => {
            let available: BTreeSet<char> =
                question.active_options().map(|slot| slot.letter).collect();
            let mut chosen = BTreeSet::new();
            for c in raw.chars().filter(|c| !c.is_whitespace() && *c != ',') {
                let letter = c.to_ascii_uppercase();
                if !available.contains(&letter) {
                    return Err(InputError::InvalidAnswer(format!("no option {letter}")));
                }
                chosen.insert(letter);
            }
            Ok(AnswerInput::Multiple(chosen))
        }
    }
}

fn single_letter(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

//
// ─── RENDERING ────────────────────────────────────────────────────────────────
//

fn print_help(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  n / p        next / previous question")?;
    writeln!(out, "  g <number>   jump to question")?;
    writeln!(out, "  s <answer>   submit (SBA: B or 2, ranking: 2 1 3 ..., multiple: ACE)")?;
    writeln!(out, "  f            flag / unflag")?;
    writeln!(out, "  l            list questions")?;
    writeln!(out, "  note         open the linked textbook note")?;
    writeln!(out, "  q            finish")
}

fn render_question(
    out: &mut impl Write,
    session: &QuizSession,
    progress: &ProgressMap,
) -> std::io::Result<()> {
    let question = session.current();
    let flag = if progress.is_flagged(question.id()) {
        "  [flagged]"
    } else {
        ""
    };
    writeln!(out)?;
    writeln!(out, "{}{flag}", session.nav_label())?;
    writeln!(out, "{}", plain_text(&question.prompt_html()))?;
    writeln!(out)?;

    let kind = match question.kind() {
        Ok(kind) => kind,
        Err(err) => return writeln!(out, "Error: {err}"),
    };
    for slot in question.active_options() {
        writeln!(out, "  {}. {}", slot.letter, plain_text(slot.text))?;
    }
    match kind {
        QuestionKind::Ranking => writeln!(out, "(rank every option: s <rank A> <rank B> ...)")?,
        QuestionKind::SelectMultiple(n) => writeln!(out, "(choose {n}: s <letters>)")?,
        QuestionKind::SingleBestAnswer => {}
    }

    if let Some(status) = progress.status(question.id()) {
        if let Ok(feedback) = reveal(question) {
            writeln!(out)?;
            render_feedback(out, &feedback)?;
        }
        render_explanation(out, question, status == AnswerStatus::Correct)?;
    }
    Ok(())
}

fn render_feedback(out: &mut impl Write, feedback: &Feedback) -> std::io::Result<()> {
    match feedback {
        Feedback::Options(options) => {
            for option in options {
                let mark = match option.mark {
                    OptionMark::Correct => "correct",
                    OptionMark::Incorrect => "incorrect",
                    OptionMark::Neutral => continue,
                };
                let chosen = if option.selected { " (your answer)" } else { "" };
                writeln!(out, "  {}: {mark}{chosen}", option.letter)?;
            }
        }
        Feedback::Ranks(ranks) => {
            for rank in ranks {
                let hint = rank.hint().map(|h| format!(" {h}")).unwrap_or_default();
                writeln!(out, "  {}: {}{hint}", rank.letter, rank.entered)?;
            }
        }
    }
    Ok(())
}

fn render_explanation(
    out: &mut impl Write,
    question: &Question,
    is_correct: bool,
) -> std::io::Result<()> {
    writeln!(out, "{}", if is_correct { "Correct" } else { "Incorrect" })?;
    let explanation = plain_text(question.explanation());
    if !explanation.is_empty() {
        writeln!(out, "{explanation}")?;
    }
    if let Some(note) = question.linked_note() {
        writeln!(out, "Linked textbook note {note} (type `note` to open)")?;
    }
    Ok(())
}

fn render_list(
    out: &mut impl Write,
    session: &QuizSession,
    progress: &ProgressMap,
) -> std::io::Result<()> {
    for entry in session.question_list(progress) {
        let status = entry.status.as_ref().map_or("", AnswerStatus::as_str);
        let flag = if entry.flagged { " [flagged]" } else { "" };
        let cursor = if entry.active { ">" } else { " " };
        writeln!(out, "{cursor} {:<14} {status}{flag}", entry.label())?;
    }
    Ok(())
}

/// Print overall and per-category progress.
///
/// # Errors
///
/// Returns the write error, if any.
pub fn render_overview(
    out: &mut impl Write,
    module: &ExamModule,
    overview: &ProgressOverview,
) -> std::io::Result<()> {
    let tally = &overview.tally;
    writeln!(out, "{module}: {} questions", module.total_questions())?;
    writeln!(
        out,
        "  correct {}  incorrect {}  flagged {}  remaining {}",
        tally.correct, tally.incorrect, tally.flagged, tally.remaining
    )?;
    for category in &overview.categories {
        writeln!(
            out,
            "  {:>2}. {:<48} {:>4}/{:<4} {:>5.1}%",
            category.category,
            category.name,
            category.answered,
            category.total,
            category.percent()
        )?;
    }
    Ok(())
}

//
// ─── TEXTBOOK ─────────────────────────────────────────────────────────────────
//

/// Without `pick`, list the notes linked from the module's textbook index.
/// With `pick`, open one entry chosen by its list number or note filename.
///
/// # Errors
///
/// Returns `TerminalError::UnknownEntry` if `pick` matches no entry and
/// `TerminalError::Textbook` if the index or note cannot be loaded.
pub async fn browse_textbook(
    out: &mut impl Write,
    textbook: &TextbookService,
    module: &ExamModule,
    pick: Option<&str>,
) -> Result<(), TerminalError> {
    let index = textbook.index(module).await?;

    let Some(pick) = pick.map(str::trim) else {
        if index.is_empty() {
            writeln!(out, "The {module} textbook index lists no notes.")?;
        }
        for (row, entry) in index.entries().iter().enumerate() {
            writeln!(out, "{:>4}. [{}] {}", row + 1, entry.note_id, entry.title)?;
        }
        return Ok(());
    };

    let by_row = pick
        .parse::<usize>()
        .ok()
        .and_then(|row| row.checked_sub(1))
        .and_then(|row| index.entries().get(row));
    let entry = by_row.or_else(|| index.entries().iter().find(|e| e.filename == pick));
    let Some(entry) = entry else {
        return Err(TerminalError::UnknownEntry(pick.to_string()));
    };

    let note = textbook.open_note_file(module, &entry.filename).await?;
    writeln!(out, "{}", note.title)?;
    writeln!(out, "{}", plain_text(&note.html))?;
    Ok(())
}

//
// ─── LOOP ─────────────────────────────────────────────────────────────────────
//

/// Counts for answers submitted during one terminal session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizSummary {
    pub answered: usize,
    pub correct: usize,
}

/// Drive `session` from `input` until `q` or end of input.
///
/// Input mistakes and failed saves are reported on `out` and the loop
/// continues.
///
/// # Errors
///
/// Returns `TerminalError::Io` if reading or writing fails.
pub async fn run_quiz<R, W>(
    quiz: &QuizService,
    textbook: &TextbookService,
    mut session: QuizSession,
    progress: &mut ProgressMap,
    input: R,
    out: &mut W,
) -> Result<QuizSummary, TerminalError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut summary = QuizSummary::default();
    let mut lines = input.lines();

    print_help(out)?;
    render_question(out, &session, progress)?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match TerminalCommand::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "{err}")?;
                continue;
            }
        };
        debug!(?command, position = session.position(), "terminal command");

        match command {
            TerminalCommand::Next => {
                session.advance(Direction::Next);
                render_question(out, &session, progress)?;
            }
            TerminalCommand::Prev => {
                session.advance(Direction::Prev);
                render_question(out, &session, progress)?;
            }
            TerminalCommand::Jump(index) => {
                session.jump_to(index);
                render_question(out, &session, progress)?;
            }
            TerminalCommand::Flag => {
                let persisted = quiz.toggle_flag(&session, progress).await;
                let state = if persisted.value { "flagged" } else { "unflagged" };
                writeln!(out, "Question {state}.")?;
                if let Some(err) = persisted.save_error {
                    writeln!(out, "warning: progress was not saved: {err}")?;
                }
            }
            TerminalCommand::Submit(raw) => {
                let question = session.current();
                if progress.status(question.id()).is_some() {
                    writeln!(out, "Already answered.")?;
                    continue;
                }
                let answer = match parse_answer(question, &raw) {
                    Ok(answer) => answer,
                    Err(err) => {
                        writeln!(out, "{err}")?;
                        continue;
                    }
                };
                match quiz.submit_answer(&session, progress, &answer).await {
                    Ok(outcome) => {
                        summary.answered += 1;
                        if outcome.is_correct() {
                            summary.correct += 1;
                        }
                        render_feedback(out, &outcome.evaluation.feedback)?;
                        render_explanation(out, session.current(), outcome.is_correct())?;
                        if let Some(err) = outcome.save_error {
                            writeln!(out, "warning: progress was not saved: {err}")?;
                        }
                    }
                    Err(err) => writeln!(out, "{err}")?,
                }
            }
            TerminalCommand::List => render_list(out, &session, progress)?,
            TerminalCommand::Note => match session.current().linked_note() {
                None => writeln!(out, "This question has no linked note.")?,
                Some(id) => match textbook.resolve_note(session.module(), &id).await {
                    Ok(note) => {
                        writeln!(out, "{}", note.title)?;
                        writeln!(out, "{}", plain_text(&note.html))?;
                    }
                    Err(err) => writeln!(out, "{err}")?,
                },
            },
            TerminalCommand::Help => print_help(out)?,
            TerminalCommand::Quit => break,
        }
    }

    writeln!(
        out,
        "Answered {} this session, {} correct.",
        summary.answered, summary.correct
    )?;
    Ok(summary)
}
