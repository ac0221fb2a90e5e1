mod terminal;

use std::fmt;
use std::io::Write;

use quiz_core::model::{ExamModule, ExamModuleError, NoteId};
use services::sessions::ParseFilterError;
use services::{AppServices, CategoryFilter, ContentLocation, QuizMode};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidModule(ExamModuleError),
    InvalidFilter(ParseFilterError),
    MissingNoteId,
    InvalidNoteId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidModule(err) => write!(f, "invalid --module value: {err}"),
            ArgsError::InvalidFilter(err) => write!(f, "{err}"),
            ArgsError::MissingNoteId => write!(f, "note requires a note id, e.g. 1_137"),
            ArgsError::InvalidNoteId { raw } => write!(f, "invalid note id: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- quiz  [options] [--category <id|all>] [--mode <mode>]");
    eprintln!("  cargo run -p app -- stats [options]");
    eprintln!("  cargo run -p app -- note <id> [options]");
    eprintln!("  cargo run -p app -- textbook [<number|filename>] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url|memory>   progress database (default sqlite://quiz.sqlite3)");
    eprintln!("  --data <dir|url>           question and textbook content (default .)");
    eprintln!("  --module <msra|pd>         exam module (default msra)");
    eprintln!("  --verbose                  debug logging");
    eprintln!();
    eprintln!("Modes: all, unanswered, incorrect, flagged");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_DATA, QUIZ_MODULE, QUIZ_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Stats,
    Note,
    Textbook,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "stats" => Some(Self::Stats),
            "note" => Some(Self::Note),
            "textbook" => Some(Self::Textbook),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Database {
    Sqlite(String),
    Memory,
}

#[derive(Debug)]
struct Args {
    database: Database,
    content: ContentLocation,
    module: ExamModule,
    category: CategoryFilter,
    mode: QuizMode,
    verbose: bool,
    note: Option<NoteId>,
    /// Textbook entry to open; `None` lists the index.
    entry: Option<String>,
}

impl Args {
    /// Environment first, then flags. `env` is injected so parsing stays
    /// testable.
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut database = parse_database(env("QUIZ_DB_URL").unwrap_or_else(|| "sqlite://quiz.sqlite3".into()))?;
        let mut content = ContentLocation::parse(&env("QUIZ_DATA").unwrap_or_else(|| ".".into()));
        let mut module = match env("QUIZ_MODULE") {
            Some(raw) => raw.parse().map_err(ArgsError::InvalidModule)?,
            None => ExamModule::msra(),
        };
        let mut category = CategoryFilter::All;
        let mut mode = QuizMode::All;
        let mut verbose = false;
        let mut note = None;
        let mut entry = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => database = parse_database(require_value(args, "--db")?)?,
                "--data" => content = ContentLocation::parse(&require_value(args, "--data")?),
                "--module" => {
                    module = require_value(args, "--module")?
                        .parse()
                        .map_err(ArgsError::InvalidModule)?;
                }
                "--category" => {
                    category = require_value(args, "--category")?
                        .parse()
                        .map_err(ArgsError::InvalidFilter)?;
                }
                "--mode" => {
                    mode = require_value(args, "--mode")?
                        .parse()
                        .map_err(ArgsError::InvalidFilter)?;
                }
                "--verbose" | "-v" => verbose = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if cmd == Command::Note && note.is_none() && !arg.starts_with("--") => {
                    note = Some(
                        arg.parse::<NoteId>()
                            .map_err(|_| ArgsError::InvalidNoteId { raw: arg.clone() })?,
                    );
                }
                _ if cmd == Command::Textbook && entry.is_none() && !arg.starts_with("--") => {
                    entry = Some(arg);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Note && note.is_none() {
            return Err(ArgsError::MissingNoteId);
        }

        Ok(Self {
            database,
            content,
            module,
            category,
            mode,
            verbose,
            note,
            entry,
        })
    }
}

fn parse_database(raw: String) -> Result<Database, ArgsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw });
    }
    if trimmed == "memory" {
        return Ok(Database::Memory);
    }
    Ok(Database::Sqlite(normalize_sqlite_url(trimmed.to_string())))
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let path_str = raw.strip_prefix("sqlite:").unwrap_or(raw.as_str()).to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("QUIZ_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: start a quiz when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Quiz,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Quiz,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing(parsed.verbose)?;

    let app = match &parsed.database {
        Database::Memory => AppServices::new_in_memory(&parsed.content)?,
        Database::Sqlite(url) => {
            // Open + migrate SQLite at startup so services stay storage-agnostic.
            prepare_sqlite_file(url)?;
            AppServices::new_sqlite(url, &parsed.content).await?
        }
    };

    let quiz = app.quiz();
    let module = &parsed.module;
    let mut stdout = std::io::stdout();

    match cmd {
        Command::Quiz => {
            let mut progress = quiz.load_progress(module).await?;
            let session = match quiz
                .start_quiz(module, &progress, parsed.category, parsed.mode)
                .await
            {
                Ok(session) => session,
                Err(services::SessionError::Empty { mode }) => {
                    writeln!(stdout, "{}", mode.empty_message())?;
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            terminal::run_quiz(
                &quiz,
                &app.textbook(),
                session,
                &mut progress,
                stdin,
                &mut stdout,
            )
            .await?;
            Ok(())
        }
        Command::Stats => {
            let progress = quiz.load_progress(module).await?;
            let overview = quiz.overview(module, &progress).await?;
            terminal::render_overview(&mut stdout, module, &overview)?;
            Ok(())
        }
        Command::Note => {
            let Some(id) = parsed.note.as_ref() else {
                return Err(ArgsError::MissingNoteId.into());
            };
            let note = app.textbook().resolve_note(module, id).await?;
            writeln!(stdout, "{}", note.title)?;
            writeln!(stdout, "{}", services::textbook::plain_text(&note.html))?;
            Ok(())
        }
        Command::Textbook => {
            terminal::browse_textbook(&mut stdout, &app.textbook(), module, parsed.entry.as_deref())
                .await?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter, |_| None)
    }

    #[test]
    fn defaults_without_env_or_flags() {
        let args = parse(Command::Quiz, &[]).unwrap();
        assert!(matches!(args.database, Database::Sqlite(ref url) if url.starts_with("sqlite://")));
        assert_eq!(args.content, ContentLocation::Directory(".".into()));
        assert_eq!(args.module.key(), "msra");
        assert_eq!(args.mode, QuizMode::All);
        assert!(!args.verbose);
    }

    #[test]
    fn flags_override_env() {
        let mut iter = ["--module", "pd", "--db", "memory", "--mode", "flagged"]
            .iter()
            .map(|s| (*s).to_string());
        let args = Args::parse(Command::Quiz, &mut iter, |key| match key {
            "QUIZ_MODULE" => Some("msra".into()),
            "QUIZ_DATA" => Some("https://cdn.example.org/quiz".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(args.module.key(), "pd");
        assert_eq!(args.database, Database::Memory);
        assert_eq!(args.mode, QuizMode::Flagged);
        assert_eq!(
            args.content,
            ContentLocation::Http("https://cdn.example.org/quiz".into())
        );
    }

    #[test]
    fn note_requires_an_id() {
        assert!(matches!(
            parse(Command::Note, &[]),
            Err(ArgsError::MissingNoteId)
        ));
        let args = parse(Command::Note, &["1_137", "--module", "pd"]).unwrap();
        assert_eq!(args.note, Some(NoteId::new("1_137")));
    }

    #[test]
    fn textbook_takes_an_optional_entry() {
        assert_eq!(parse(Command::Textbook, &[]).unwrap().entry, None);
        let args = parse(Command::Textbook, &["12", "--module", "pd"]).unwrap();
        assert_eq!(args.entry.as_deref(), Some("12"));
        assert_eq!(args.module.key(), "pd");
        assert!(matches!(
            parse(Command::Textbook, &["1", "2"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert_eq!(Command::from_arg("textbook"), Some(Command::Textbook));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(Command::Quiz, &["--module", "usmle"]),
            Err(ArgsError::InvalidModule(_))
        ));
        assert!(matches!(
            parse(Command::Quiz, &["--category", "cardio"]),
            Err(ArgsError::InvalidFilter(_))
        ));
        assert!(matches!(
            parse(Command::Quiz, &["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            parse(Command::Stats, &["extra"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }
}
