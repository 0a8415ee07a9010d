use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use lingo_core::model::{ExerciseId, ExerciseKind, ExerciseStep, StepAnswer, Theme, parse_toggle};
use services::{
    BackendConfig, Clock, ExerciseBackend, ExerciseFlow, FlowPhase, FlowView, HttpBackend,
    LeaderboardService, PreferencesService, PrimaryAction, QuitPrompt, Route, SystemChrome,
};
use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const QUIT_COMMAND: &str = ":q";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingExerciseId,
    InvalidExerciseId { raw: String },
    InvalidKind { raw: String },
    InvalidTheme { raw: String },
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
    InvalidToggle { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingExerciseId => write!(f, "play requires --exercise-id"),
            ArgsError::InvalidExerciseId { raw } => write!(f, "invalid --exercise-id value: {raw}"),
            ArgsError::InvalidKind { raw } => write!(f, "invalid --kind value: {raw}"),
            ArgsError::InvalidTheme { raw } => write!(f, "invalid --theme value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidToggle { raw } => write!(f, "invalid --notifications value: {raw}"),
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
    eprintln!("  cargo run -p app -- play --exercise-id <id> [--kind quiz|pyramid] [--shuffle]");
    eprintln!("  cargo run -p app -- leaderboard [--limit <n>]");
    eprintln!("  cargo run -p app -- prefs [--theme light|dark|system] [--language <tag>] [--notifications on|off]");
    eprintln!();
    eprintln!("Global options:");
    eprintln!("  --db <sqlite_url>   (default: sqlite:lingo.sqlite3)");
    eprintln!("  --api <base_url>    (default: {})", services::backend::DEFAULT_API_BASE_URL);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LINGO_DB_URL, LINGO_API_BASE_URL, LINGO_API_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Play {
        exercise_id: ExerciseId,
        kind: ExerciseKind,
        shuffle: bool,
    },
    Leaderboard {
        limit: Option<u32>,
    },
    Prefs {
        theme: Option<Theme>,
        language: Option<String>,
        notifications: Option<bool>,
    },
}

struct Args {
    db_url: String,
    api_base_url: Option<String>,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let subcommand = args.next().unwrap_or_default();

        let mut db_url = std::env::var("LINGO_DB_URL")
            .ok()
            .map_or_else(
                || normalize_sqlite_url("sqlite:lingo.sqlite3".into()),
                normalize_sqlite_url,
            );
        let mut api_base_url = None;
        let mut exercise_id = None;
        let mut kind = ExerciseKind::Quiz;
        let mut shuffle = false;
        let mut limit = None;
        let mut theme = None;
        let mut language = None;
        let mut notifications = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--api" => api_base_url = Some(require_value(&mut args, "--api")?),
                "--exercise-id" => {
                    let value = require_value(&mut args, "--exercise-id")?;
                    let parsed = value
                        .parse::<ExerciseId>()
                        .map_err(|_| ArgsError::InvalidExerciseId { raw: value.clone() })?;
                    exercise_id = Some(parsed);
                }
                "--kind" => {
                    let value = require_value(&mut args, "--kind")?;
                    kind = ExerciseKind::parse(&value)
                        .ok_or(ArgsError::InvalidKind { raw: value })?;
                }
                "--shuffle" => shuffle = true,
                "--limit" => {
                    let value = require_value(&mut args, "--limit")?;
                    let parsed: u32 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                    limit = Some(parsed);
                }
                "--theme" => {
                    let value = require_value(&mut args, "--theme")?;
                    let parsed = value
                        .parse::<Theme>()
                        .map_err(|_| ArgsError::InvalidTheme { raw: value.clone() })?;
                    theme = Some(parsed);
                }
                "--language" => language = Some(require_value(&mut args, "--language")?),
                "--notifications" => {
                    let value = require_value(&mut args, "--notifications")?;
                    notifications = Some(
                        parse_toggle(&value).map_err(|_| ArgsError::InvalidToggle { raw: value })?,
                    );
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match subcommand.as_str() {
            "play" => Command::Play {
                exercise_id: exercise_id.ok_or(ArgsError::MissingExerciseId)?,
                kind,
                shuffle,
            },
            "leaderboard" => Command::Leaderboard { limit },
            "prefs" => Command::Prefs {
                theme,
                language,
                notifications,
            },
            _ => return Err(ArgsError::UnknownArg(subcommand)),
        };

        Ok(Self {
            db_url,
            api_base_url,
            command,
        })
    }

    fn backend_config(&self) -> Result<BackendConfig, services::BackendError> {
        match self.api_base_url.as_deref() {
            Some(url) => {
                Ok(BackendConfig::new(url)?.with_token(std::env::var("LINGO_API_TOKEN").ok()))
            }
            None => BackendConfig::from_env(),
        }
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

/// Asks on stdin before abandoning a session.
struct StdinQuitPrompt;

impl QuitPrompt for StdinQuitPrompt {
    fn confirm_quit(&self) -> bool {
        matches!(
            prompt_line("Quit this session? Progress will be lost. [y/N] ").as_deref(),
            Some("y" | "Y" | "yes")
        )
    }
}

/// A terminal has no navigation bar; record the request for diagnostics.
struct TerminalChrome;

impl SystemChrome for TerminalChrome {
    fn set_navigation_bar_visible(&self, visible: bool) {
        tracing::debug!(visible, "navigation bar visibility");
    }
}

fn prompt_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn render_view(view: &FlowView) {
    let filled = (view.progress / 5.0).round().clamp(0.0, 20.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = filled as usize;
    println!(
        "[{}{}] {:>5.1}%  step {}/{}",
        "#".repeat(filled),
        "-".repeat(20 - filled),
        view.progress,
        view.current_step + 1,
        view.total_steps
    );
}

fn render_step(step: &ExerciseStep) {
    match step {
        ExerciseStep::Quiz(question) => {
            println!("{}", question.prompt);
            for (index, option) in question.options.iter().enumerate() {
                println!("  {}) {option}", index + 1);
            }
        }
        ExerciseStep::Pyramid(stage) => {
            println!("{:?}: {}", stage.operation, stage.instruction);
            println!("  {}", stage.sentence);
        }
    }
}

/// Turn a typed line into an answer; quiz options may be picked by number.
fn read_answer(step: &ExerciseStep, line: String) -> StepAnswer {
    match step {
        ExerciseStep::Quiz(question) => {
            let picked = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| question.options.get(index).cloned());
            StepAnswer::Choice(picked.unwrap_or(line))
        }
        ExerciseStep::Pyramid(_) => StepAnswer::Text(line),
    }
}

async fn play(
    backend: Arc<dyn ExerciseBackend>,
    exercise_id: ExerciseId,
    kind: ExerciseKind,
    shuffle: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut flow = ExerciseFlow::new(kind, backend, Clock::default_clock())
        .with_chrome(Arc::new(TerminalChrome))
        .with_shuffle_options(shuffle);

    let view = flow.load(exercise_id).await?;
    if let Some(error) = view.error {
        println!("{error}");
        return Ok(());
    }
    if let Some(exercise) = flow.exercise() {
        println!("== {} ==  (type {QUIT_COMMAND} to quit)", exercise.title);
    }

    loop {
        let view = flow.view();
        if !matches!(view.phase, FlowPhase::InProgress | FlowPhase::LastStep) {
            return Ok(());
        }
        render_view(&view);
        let Some(step) = flow.current_step_data().cloned() else {
            return Ok(());
        };
        render_step(&step);

        // stdin closed; dropping the flow restores the navigation bar
        let Some(line) = prompt_line("> ") else {
            return Ok(());
        };
        if line == QUIT_COMMAND {
            if let Some(Route::ModuleRoot(kind)) = flow.quit(&StdinQuitPrompt)? {
                println!("Back to {kind} exercises.");
                return Ok(());
            }
            continue;
        }

        let answer = read_answer(&step, line);
        match view.primary_action {
            PrimaryAction::Continue => match flow.submit_answer(answer).await {
                Ok(outcome) => {
                    if let Some(message) = outcome.feedback.message {
                        println!("{message}");
                    }
                }
                Err(services::FlowError::Backend(err)) => println!("{}", err.user_message()),
                Err(err) => return Err(err.into()),
            },
            PrimaryAction::Finish => match flow.finish(answer).await {
                Ok(Route::Result(result)) => {
                    println!(
                        "Done: {}/{} correct, +{} XP (total {}).",
                        result.correct, result.answered, result.xp.earned, result.xp.total
                    );
                    return Ok(());
                }
                Ok(Route::ModuleRoot(_)) => return Ok(()),
                Err(services::FlowError::Backend(err)) => println!("{}", err.user_message()),
                Err(err) => return Err(err.into()),
            },
            PrimaryAction::Hidden => return Ok(()),
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || matches!(argv[0].as_str(), "--help" | "-h") {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match parsed.command.clone() {
        Command::Play {
            exercise_id,
            kind,
            shuffle,
        } => {
            let backend: Arc<dyn ExerciseBackend> =
                Arc::new(HttpBackend::new(parsed.backend_config()?));
            play(backend, exercise_id, kind, shuffle).await
        }
        Command::Leaderboard { limit } => {
            let backend: Arc<dyn ExerciseBackend> =
                Arc::new(HttpBackend::new(parsed.backend_config()?));
            let entries = LeaderboardService::new(backend).top(limit).await?;
            for entry in entries {
                println!("{:>3}. {:<24} {:>6} XP", entry.rank, entry.display_name, entry.xp);
            }
            Ok(())
        }
        Command::Prefs {
            theme,
            language,
            notifications,
        } => {
            // Open + migrate SQLite here so core/services stay storage-agnostic.
            prepare_sqlite_file(&parsed.db_url)?;
            let storage = Storage::sqlite(&parsed.db_url).await?;
            let prefs = PreferencesService::new(Arc::clone(&storage.preferences));

            if let Some(theme) = theme {
                prefs.set_theme(theme).await;
            }
            if let Some(language) = language {
                prefs.set_language(&language).await?;
            }
            if let Some(enabled) = notifications {
                prefs.set_notifications_enabled(enabled).await;
            }

            let current = prefs.load().await;
            println!("theme:         {}", current.theme());
            println!("language:      {}", current.language());
            println!(
                "notifications: {}",
                if current.notifications_enabled() { "on" } else { "off" }
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info,storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_core::model::QuizQuestion;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_play_command() {
        let args =
            Args::parse(argv(&["play", "--exercise-id", "12", "--kind", "pyramid"])).unwrap();
        assert_eq!(
            args.command,
            Command::Play {
                exercise_id: ExerciseId::new(12),
                kind: ExerciseKind::Pyramid,
                shuffle: false,
            }
        );
    }

    #[test]
    fn play_requires_exercise_id() {
        assert!(matches!(
            Args::parse(argv(&["play"])),
            Err(ArgsError::MissingExerciseId)
        ));
    }

    #[test]
    fn parses_prefs_flags() {
        let args = Args::parse(argv(&[
            "prefs",
            "--theme",
            "dark",
            "--notifications",
            "off",
        ]))
        .unwrap();
        assert_eq!(
            args.command,
            Command::Prefs {
                theme: Some(Theme::Dark),
                language: None,
                notifications: Some(false),
            }
        );
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(matches!(
            Args::parse(argv(&["leaderboard", "--verbose"])),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn numbered_quiz_answer_picks_option() {
        let step = ExerciseStep::Quiz(QuizQuestion {
            prompt: "rot".into(),
            options: vec!["red".into(), "green".into()],
            answer: "red".into(),
        });
        assert_eq!(read_answer(&step, "2".into()), StepAnswer::Choice("green".into()));
        assert_eq!(read_answer(&step, "red".into()), StepAnswer::Choice("red".into()));
        assert_eq!(read_answer(&step, "9".into()), StepAnswer::Choice("9".into()));
    }
}
