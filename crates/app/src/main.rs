use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use quiz_core::model::{Category, CategoryKey, Question, QuestionKind, QuizKind};
use serde::Deserialize;
use services::{
    AnswerOutcome, Clock, EngineAdvance, EngineSettings, QuizEngine, QuizSummary, QuizType,
};
use storage::{InMemoryRepository, Storage};
use tracing::info;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingVocab,
    UnknownQuiz { raw: String },
    MissingCategory { kind: QuizKind },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingVocab => write!(f, "no vocabulary file (use --vocab or QUIZ_VOCAB)"),
            ArgsError::UnknownQuiz { raw } => write!(f, "unknown quiz type: {raw}"),
            ArgsError::MissingCategory { kind } => {
                write!(f, "{kind} quiz needs at least one --category")
            }
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
    eprintln!("  cargo run -p app -- list --vocab <file.json> [--settings <file.json>]");
    eprintln!(
        "  cargo run -p app -- run  --vocab <file.json> --quiz <type> [--category <key>]... [--settings <file.json>]"
    );
    eprintln!();
    eprintln!("Quiz types:");
    let kinds: Vec<&str> = QuizKind::ALL.iter().map(|k| k.as_str()).collect();
    eprintln!("  {}", kinds.join(", "));
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_VOCAB, QUIZ_SETTINGS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Run,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "run" => Some(Self::Run),
            _ => None,
        }
    }
}

struct Args {
    vocab: PathBuf,
    settings: Option<PathBuf>,
    quiz: Option<QuizKind>,
    categories: Vec<CategoryKey>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut vocab = std::env::var("QUIZ_VOCAB").ok().map(PathBuf::from);
        let mut settings = std::env::var("QUIZ_SETTINGS").ok().map(PathBuf::from);
        let mut quiz = None;
        let mut categories = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--vocab" => vocab = Some(require_value(args, "--vocab")?.into()),
                "--settings" => settings = Some(require_value(args, "--settings")?.into()),
                "--quiz" => {
                    let raw = require_value(args, "--quiz")?;
                    quiz = Some(QuizKind::parse(&raw).ok_or(ArgsError::UnknownQuiz { raw })?);
                }
                "--category" => {
                    categories.push(CategoryKey::new(require_value(args, "--category")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            vocab: vocab.ok_or(ArgsError::MissingVocab)?,
            settings,
            quiz,
            categories,
        })
    }

    fn quiz_type(&self) -> Result<QuizType, ArgsError> {
        let kind = self.quiz.unwrap_or(QuizKind::Random);
        let quiz_type = match kind {
            QuizKind::Category => {
                let key = self
                    .categories
                    .first()
                    .ok_or(ArgsError::MissingCategory { kind })?;
                QuizType::Category { key: key.clone() }
            }
            QuizKind::MixedCategories => QuizType::MixedCategories {
                keys: self.categories.clone(),
            },
            QuizKind::Random => QuizType::Random,
            QuizKind::Bookmarked => QuizType::Bookmarked,
            QuizKind::Speed => QuizType::Speed,
            QuizKind::Final => QuizType::Final,
            QuizKind::HardOnly => QuizType::HardOnly,
            QuizKind::EasyOnly => QuizType::EasyOnly,
            QuizKind::Progressive => QuizType::Progressive,
            QuizKind::Adaptive => QuizType::Adaptive,
        };
        Ok(quiz_type)
    }
}

/// On-disk vocabulary: `{ "categories": [ { "key", "name", "words": [...] } ] }`.
#[derive(Debug, Deserialize)]
struct VocabularyFile {
    categories: Vec<Category>,
}

fn load_repository(path: &Path) -> Result<InMemoryRepository, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let file: VocabularyFile = serde_json::from_str(&raw)?;
    let repo = InMemoryRepository::new();
    let mut words = 0;
    for category in file.categories {
        // Re-key through the constructor so keys are normalized like user input.
        let key = CategoryKey::new(category.key.as_str());
        words += category.words.len();
        repo.upsert_category(Category::new(key, category.name, category.words)?)?;
    }
    info!(path = %path.display(), words, "vocabulary loaded");
    Ok(repo)
}

fn load_settings(path: Option<&Path>) -> Result<EngineSettings, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineSettings::from_json_str(&std::fs::read_to_string(path)?)?),
        None => Ok(EngineSettings::default()),
    }
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}

fn show_question(index: usize, total: usize, question: &Question, remaining: Option<u64>) {
    println!();
    match remaining {
        Some(secs) => println!("[{}/{total}] ({secs}s)", index + 1),
        None => println!("[{}/{total}]", index + 1),
    }
    match question.kind() {
        QuestionKind::SentenceTranslation => {
            println!("Translate: {}", question.prompt_sentence().unwrap_or(question.prompt()));
        }
        _ => println!("Translate: {}", question.prompt()),
    }
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
}

fn show_outcome(outcome: &AnswerOutcome) {
    let record = &outcome.record;
    if outcome.late_submission || record.is_timeout() {
        println!("Time's up! The answer was: {}", record.correct_answer);
    } else if record.is_correct {
        println!("Correct!");
    } else {
        println!("Not quite. The answer was: {}", record.correct_answer);
    }
}

fn show_summary(summary: &QuizSummary) {
    let result = &summary.result;
    println!();
    println!(
        "Score: {}/{} ({}%), needed {}",
        result.score(),
        result.total(),
        result.percentage(),
        result.pass_threshold()
    );
    println!("{}", if result.passed() { "Passed!" } else { "Not passed." });
    println!("Time: {:.1}s", result.total_time_spent().as_secs_f64());
    if summary.is_personal_best && summary.previous_best.is_some() {
        println!("New personal best!");
    }
}

/// Map a numbered choice onto its multiple-choice option.
fn resolve_choice(question: &Question, input: &str) -> String {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options().get(i))
        .cloned()
        .unwrap_or_else(|| input.to_owned())
}

async fn list(engine: &QuizEngine) -> Result<(), Box<dyn std::error::Error>> {
    for availability in engine.list_available_quiz_types().await? {
        match availability.reason {
            None => println!("{:<18} available", availability.kind.as_str()),
            Some(reason) => println!("{:<18} unavailable: {reason}", availability.kind.as_str()),
        }
    }
    Ok(())
}

async fn run_quiz(
    engine: &mut QuizEngine,
    quiz_type: &QuizType,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = engine.start_quiz(quiz_type).await?;
    let total = session.quiz().len();
    let mut current = session.current_question().cloned();
    let mut index = 0;
    let stdin = io::stdin();
    let mut input = stdin.lock();

    while let Some(question) = current.take() {
        let remaining = engine
            .session()
            .and_then(|s| s.remaining_time())
            .map(|d| d.as_secs());
        show_question(index, total, &question, remaining);
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = read_line(&mut input)? else {
            engine.cancel()?;
            println!("Quiz cancelled.");
            return Ok(());
        };
        let answer = resolve_choice(&question, &line);
        if answer.trim().is_empty() {
            if let Some(outcome) = engine.tick() {
                show_outcome(&outcome);
            } else {
                println!("Please type an answer.");
                current = Some(question);
                continue;
            }
        } else {
            show_outcome(&engine.submit_answer(&answer)?);
        }

        match engine.advance().await? {
            EngineAdvance::NextQuestion(next) => {
                index += 1;
                current = Some(next);
            }
            EngineAdvance::Results(summary) => show_summary(&summary),
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => {
            print_usage();
            return Ok(());
        }
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::List,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let repo = load_repository(&parsed.vocab)?;
    let settings = load_settings(parsed.settings.as_deref())?;
    let mut engine =
        QuizEngine::new(Storage::in_memory(&repo), settings)?.with_clock(Clock::default_clock());

    match cmd {
        Command::List => list(&engine).await,
        Command::Run => {
            let quiz_type = parsed.quiz_type()?;
            run_quiz(&mut engine, &quiz_type).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Quiet by default; RUST_LOG=debug shows engine state transitions on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
