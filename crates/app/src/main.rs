use std::fmt;
use std::io::Write as _;
use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{OptionIndex, QuestionStatus, Subject};
use services::{
    AuthService, ExamLoopService, ExamPhase, ExamSession, SelectOutcome, SessionView, Ticker,
};
use storage::repository::{RosterStore, Storage};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

mod bank;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

struct Args {
    db_url: String,
    bank_path: Option<String>,
    roster_path: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run  [--db <sqlite_url>] [--bank <json>] [--roster <file>]");
    eprintln!("  cargo run -p app -- seed [--db <sqlite_url>] [--roster <file>]");
    eprintln!();
    eprintln!("Defaults for run:");
    eprintln!("  --db sqlite:exam.sqlite3");
    eprintln!("  built-in sample paper and roster when --bank/--roster are omitted");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_BANK_PATH, EXAM_ROSTER_PATH");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://exam.sqlite3".into(), normalize_sqlite_url);
        let mut bank_path = std::env::var("EXAM_BANK_PATH").ok();
        let mut roster_path = std::env::var("EXAM_ROSTER_PATH").ok();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bank" => bank_path = Some(require_value(args, "--bank")?),
                "--roster" => roster_path = Some(require_value(args, "--roster")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            bank_path,
            roster_path,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
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
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Seed => {
            let rolls = bank::load_roster(parsed.roster_path.as_deref())?;
            storage.roster.replace_all(&rolls).await?;
            println!("seeded roster with {} roll(s)", rolls.len());
            Ok(())
        }
        Command::Run => {
            if parsed.roster_path.is_some() || storage.roster.len().await? == 0 {
                let rolls = bank::load_roster(parsed.roster_path.as_deref())?;
                storage.roster.replace_all(&rolls).await?;
            }

            let paper = Arc::new(bank::load_bank(parsed.bank_path.as_deref())?);
            run_exam(&storage, paper).await
        }
    }
}

async fn run_exam(
    storage: &Storage,
    paper: Arc<exam_core::model::QuestionBank>,
) -> Result<(), Box<dyn std::error::Error>> {
    let clock = Clock::default_clock();
    let auth = AuthService::new(Arc::clone(&storage.roster));
    let exam = ExamLoopService::new(clock, paper, Arc::clone(&storage.sessions));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("NEET mock exam. Enter your roll number to begin.");
    let Some(roll) = read_roll(&auth, &mut lines).await? else {
        return Ok(());
    };

    let mut session = exam.login(roll).await?;
    let view = SessionView::snapshot(&session, exam.now());
    println!();
    println!(
        "Welcome {}. {} questions, time left {}.",
        view.roll,
        view.questions.len(),
        view.time_left
    );
    if view.phase == ExamPhase::TimeExpired {
        println!("Time is already up; you can review and submit, but not change answers.");
    }
    println!("Type 'help' for commands.");
    println!();
    print!("{}", render_question(&session));
    prompt();

    let (ticker, mut ticks) = exam.start_ticker();
    let mut ticker = Some(ticker);

    loop {
        tokio::select! {
            tick = ticks.recv(), if ticker.is_some() => {
                if tick.is_none() {
                    continue;
                }
                let status = exam.handle_tick(&mut session, &mut ticker);
                if status.expired_now {
                    println!();
                    println!("Time is up! Answers are locked; you can still review and submit.");
                    prompt();
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed; state stays persisted for the next login
                    break;
                };
                match dispatch(&exam, &mut session, &mut ticker, line.trim()).await? {
                    Flow::Continue => prompt(),
                    Flow::Exit => break,
                }
            }
        }
    }

    if let Some(active) = ticker.take() {
        active.stop();
    }
    Ok(())
}

async fn read_roll(
    auth: &AuthService,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<Option<exam_core::model::RollNumber>, Box<dyn std::error::Error>> {
    loop {
        print!("roll number> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match auth.authenticate(line.trim()).await {
            Ok(roll) => return Ok(Some(roll)),
            Err(services::AuthError::Storage(err)) => return Err(err.into()),
            Err(err) => println!("{err}"),
        }
    }
}

enum Flow {
    Continue,
    Exit,
}

async fn dispatch(
    exam: &ExamLoopService,
    session: &mut ExamSession,
    ticker: &mut Option<Ticker>,
    line: &str,
) -> Result<Flow, Box<dyn std::error::Error>> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => {}
        Some("help") => print_help(),
        Some("view" | "v") => {
            print!("{}", render_question(session));
        }
        Some("status" | "palette") => {
            let view = SessionView::snapshot(session, exam.now());
            print!("{}", render_palette(&view));
        }
        Some("answer" | "a") => {
            let number = parts.next().and_then(|raw| raw.parse::<usize>().ok());
            let choice = parts.next().and_then(|raw| raw.parse::<u8>().ok());
            match (number, choice) {
                (Some(number), Some(choice)) => {
                    answer_question(exam, session, number, choice).await?;
                }
                _ => println!("usage: answer <question#> <option 1-4>"),
            }
        }
        Some("mark" | "m") => {
            match parts.next().and_then(|raw| raw.parse::<usize>().ok()) {
                Some(number) => mark_question(exam, session, number).await?,
                None => println!("usage: mark <question#>"),
            }
        }
        Some("goto" | "g") => {
            match parts.next().and_then(|raw| raw.parse::<usize>().ok()) {
                Some(number) => {
                    let moved = match number.checked_sub(1) {
                        Some(index) => exam.navigate(session, index).await?,
                        None => false,
                    };
                    if moved {
                        print!("{}", render_question(session));
                    } else {
                        println!("no such question (1-{})", session.bank().len());
                    }
                }
                None => println!("usage: goto <question#>"),
            }
        }
        Some("subject" | "s") => match parts.next().map(str::parse::<Subject>) {
            Some(Ok(subject)) => match session.bank().find_first_by_subject(subject) {
                Some(index) => {
                    exam.navigate(session, index).await?;
                    print!("{}", render_question(session));
                }
                None => println!("no {subject} questions in this paper"),
            },
            _ => println!("usage: subject <physics|chemistry|biology>"),
        },
        Some("submit") => {
            let summary = exam.submit(session, ticker).await?;
            println!();
            println!("Submitted at {}.", summary.submitted_at().to_rfc3339());
            println!(
                "Answered {}, marked for review {}, unanswered {} (of {}).",
                summary.answered(),
                summary.marked(),
                summary.unanswered(),
                summary.total_questions()
            );
            return Ok(Flow::Exit);
        }
        Some("logout") => {
            exam.logout(session, ticker).await?;
            println!("Logged out; this sitting has been discarded.");
            return Ok(Flow::Exit);
        }
        Some("quit" | "exit") => {
            println!("Leaving; your progress is saved. Log in again to resume.");
            return Ok(Flow::Exit);
        }
        Some(other) => println!("unknown command: {other} (try 'help')"),
    }
    Ok(Flow::Continue)
}

async fn answer_question(
    exam: &ExamLoopService,
    session: &mut ExamSession,
    number: usize,
    choice: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(index) = number.checked_sub(1) else {
        println!("questions are numbered from 1");
        return Ok(());
    };
    let Ok(question) = session.bank().get(index) else {
        println!("no such question (1-{})", session.bank().len());
        return Ok(());
    };
    let id = question.id();

    let Some(option) = choice
        .checked_sub(1)
        .and_then(|raw| OptionIndex::new(raw).ok())
    else {
        println!("options are numbered 1-4");
        return Ok(());
    };

    match exam.select_option(session, id, option).await? {
        SelectOutcome::Recorded => println!("Q{number}: option {choice} recorded."),
        SelectOutcome::RejectedExpired => {
            println!("Time is up; answers can no longer be changed.");
        }
        SelectOutcome::RejectedPlaceholder => {
            println!("Q{number} is a placeholder; there is nothing to answer.");
        }
        SelectOutcome::RejectedUnavailable => {
            println!("Q{number} option {choice} is unavailable.");
        }
    }
    Ok(())
}

async fn mark_question(
    exam: &ExamLoopService,
    session: &mut ExamSession,
    number: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(question) = number
        .checked_sub(1)
        .and_then(|index| session.bank().get(index).ok())
    else {
        println!("no such question (1-{})", session.bank().len());
        return Ok(());
    };
    let id = question.id();

    if exam.toggle_review(session, id).await? {
        println!("Q{number} marked for review.");
    } else {
        println!("Q{number} unmarked.");
    }
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("Commands:");
    println!("  view            show the current question");
    println!("  status          palette of all questions and time left");
    println!("  answer <q> <n>  choose option n (1-4) for question q");
    println!("  mark <q>        toggle the review flag on question q");
    println!("  goto <q>        jump to question q");
    println!("  subject <name>  jump to the first physics/chemistry/biology question");
    println!("  submit          finish the exam and show the summary");
    println!("  logout          discard this sitting and leave");
    println!("  quit            leave; progress stays saved");
}

fn render_question(session: &ExamSession) -> String {
    let Some(question) = session.current_question() else {
        return String::from("no question to display\n");
    };
    let number = session.current_index() + 1;

    let mut out = String::new();
    if question.is_placeholder() {
        out.push_str(&format!(
            "Q{number} [{}]: (placeholder; this slot has no question)\n",
            question.subject()
        ));
        return out;
    }

    out.push_str(&format!(
        "Q{number} [{}]: {}\n",
        question.subject(),
        question.prompt()
    ));
    let chosen = session.state().answer(question.id());
    for raw in 0..4_u8 {
        let Ok(index) = OptionIndex::new(raw) else {
            continue;
        };
        let marker = if chosen == Some(index) { "*" } else { " " };
        match question.option(index) {
            Some(text) => out.push_str(&format!("  {marker}{}) {text}\n", raw + 1)),
            None => out.push_str(&format!("  {marker}{}) (unavailable)\n", raw + 1)),
        }
    }
    out
}

fn render_palette(view: &SessionView) -> String {
    let mut out = String::new();
    out.push_str("  ");
    for question in &view.questions {
        let tag = match question.status {
            QuestionStatus::Unanswered => "-",
            QuestionStatus::Answered => "A",
            QuestionStatus::Marked => "M",
            QuestionStatus::AnsweredAndMarked => "AM",
        };
        let cursor = if question.index == view.current_index {
            ">"
        } else {
            ""
        };
        out.push_str(&format!("{cursor}{}:{tag} ", question.index + 1));
    }
    out.push('\n');
    out.push_str(&format!(
        "  answered {}, marked {}, unanswered {} | time left {}\n",
        view.answered, view.marked, view.unanswered, view.time_left
    ));
    if view.phase == ExamPhase::TimeExpired {
        out.push_str("  time is up; answers are locked\n");
    }
    out
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
