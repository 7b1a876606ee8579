use std::fmt;
use std::sync::Arc;

use learning_core::model::{CourseId, LectureId};
use services::{
    ApiConfig, Clock, CompletionOutcome, CourseApi, EnrollmentCatalog, HttpCourseApi,
    LearningSession, LearningSessionService, TrackerSettings,
};
use storage::repository::Storage;
use tokio::sync::Mutex;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { raw } => write!(f, "invalid id: {raw:?}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  learn-tracker open       <course-id>              [options]");
    eprintln!("  learn-tracker next       <course-id>              [options]");
    eprintln!("  learn-tracker prev       <course-id>              [options]");
    eprintln!("  learn-tracker select     <course-id> <lecture-id> [options]");
    eprintln!("  learn-tracker complete   <course-id> <lecture-id> [options]");
    eprintln!("  learn-tracker incomplete <course-id> <lecture-id> [options]");
    eprintln!("  learn-tracker toggle     <course-id> <lecture-id> [options]");
    eprintln!("  learn-tracker my-courses [--search <term>]        [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --api <url>          backend base URL (default http://localhost:5000/api)");
    eprintln!("  --token <token>      bearer token for the backend");
    eprintln!("  --db <sqlite_url>    last-watched store (default sqlite://learn-tracker.sqlite3)");
    eprintln!("  --no-auto-advance    stay on a lecture after completing it");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_API_BASE_URL, LEARN_API_TOKEN, LEARN_API_TIMEOUT_SECS, LEARN_DB_URL,");
    eprintln!("  LEARN_AUTO_ADVANCE, LEARN_AUTO_ADVANCE_MS, LEARN_ALLOW_DIRECT_VIDEO, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Open,
    Next,
    Previous,
    Select,
    Complete,
    Incomplete,
    Toggle,
    MyCourses,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "open" | "learn" => Some(Self::Open),
            "next" => Some(Self::Next),
            "prev" | "previous" => Some(Self::Previous),
            "select" => Some(Self::Select),
            "complete" => Some(Self::Complete),
            "incomplete" => Some(Self::Incomplete),
            "toggle" => Some(Self::Toggle),
            "my-courses" => Some(Self::MyCourses),
            _ => None,
        }
    }

    fn needs_lecture(self) -> bool {
        matches!(
            self,
            Self::Select | Self::Complete | Self::Incomplete | Self::Toggle
        )
    }
}

struct Args {
    api: ApiConfig,
    settings: TrackerSettings,
    db_url: String,
    search: Option<String>,
    course_id: Option<CourseId>,
    lecture_id: Option<LectureId>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api = ApiConfig::from_env();
        let mut settings = TrackerSettings::from_env();
        let mut db_url = std::env::var("LEARN_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| "sqlite://learn-tracker.sqlite3".into(), normalize_sqlite_url);
        let mut search = None;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => api.base_url = require_value(args, "--api")?,
                "--token" => api = api.with_token(Some(require_value(args, "--token")?)),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--no-auto-advance" => settings.auto_advance = false,
                "--search" if cmd == Command::MyCourses => {
                    search = Some(require_value(args, "--search")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let course_id = if cmd == Command::MyCourses {
            None
        } else {
            let raw = positional
                .next()
                .ok_or(ArgsError::MissingArgument { name: "course-id" })?;
            Some(CourseId::new(&raw).map_err(|_| ArgsError::InvalidId { raw })?)
        };
        let lecture_id = if cmd.needs_lecture() {
            let raw = positional
                .next()
                .ok_or(ArgsError::MissingArgument { name: "lecture-id" })?;
            Some(LectureId::new(&raw).map_err(|_| ArgsError::InvalidId { raw })?)
        } else {
            None
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            api,
            settings,
            db_url,
            search,
            course_id,
            lecture_id,
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

fn print_session(session: &LearningSession) {
    let course = session.course();
    let overview = session.overview();
    println!("{} ({})", course.title(), course.id());
    if let Some(category) = course.category() {
        println!("  category: {category}");
    }
    println!(
        "  progress: {} ({} of {} lectures, ~{}h of {}h watched)",
        overview.progress,
        overview.completed,
        overview.total,
        overview.hours_watched,
        course.duration_hours()
    );
    println!();

    for item in session.lecture_list() {
        let marker = if item.current { '>' } else { ' ' };
        let done = if item.completed { 'x' } else { ' ' };
        let mut line = format!("{marker} [{done}] {:>2}. {}", item.position, item.title);
        if !item.playable {
            line.push_str("  (video unavailable)");
        }
        if item.resource_count > 0 {
            line.push_str(&format!("  +{} resources", item.resource_count));
        }
        println!("{line}  <{}>", item.id);
    }

    if let Some(lecture) = session.current_lecture() {
        println!();
        println!("Now watching: {}", lecture.title());
        if let Some(embed) = session.current_embed_url() {
            println!("  embed: {embed}");
        } else if let Some(link) = session.external_video_link() {
            println!("  open externally: {link}");
        }
        for resource in lecture.resources() {
            println!("  resource: {} -> {}", resource.title(), resource.file_url());
        }
    } else if session.lectures().is_empty() {
        println!("This course has no lectures yet.");
    }
}

fn print_outcome(outcome: &CompletionOutcome) {
    let state = if outcome.completed { "completed" } else { "not completed" };
    match &outcome.message {
        Some(message) => println!("{message}"),
        None => println!("Lecture {} {state}", outcome.lecture_id),
    }
    println!("Course progress: {}", outcome.progress);
}

async fn run_session_command(
    cmd: Command,
    args: Args,
    api: Arc<dyn CourseApi>,
) -> Result<(), Box<dyn std::error::Error>> {
    let course_id = args
        .course_id
        .ok_or(ArgsError::MissingArgument { name: "course-id" })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    let service = LearningSessionService::new(Clock::system(), api, Arc::clone(&storage.slots))
        .with_settings(args.settings);

    let mut session = service.open(&course_id).await?;

    let outcome = match (cmd, args.lecture_id.as_ref()) {
        (Command::Open, _) => None,
        (Command::Next, _) => {
            service.next(&mut session).await?;
            None
        }
        (Command::Previous, _) => {
            service.previous(&mut session).await?;
            None
        }
        (Command::Select, Some(lecture_id)) => {
            service.select_lecture(&mut session, lecture_id).await?;
            None
        }
        (Command::Complete, Some(lecture_id)) => {
            Some(service.mark_complete(&mut session, lecture_id).await?)
        }
        (Command::Incomplete, Some(lecture_id)) => {
            Some(service.mark_incomplete(&mut session, lecture_id).await?)
        }
        (Command::Toggle, Some(lecture_id)) => {
            Some(service.toggle_completion(&mut session, lecture_id).await?)
        }
        _ => return Err(ArgsError::MissingArgument { name: "lecture-id" }.into()),
    };

    let Some(outcome) = outcome else {
        print_session(&session);
        return Ok(());
    };
    print_outcome(&outcome);

    let session = Mutex::new(session);
    if let Some(ticket) = outcome.auto_advance {
        log::info!(
            "advancing to {} in {}ms",
            ticket.target(),
            ticket.delay().as_millis()
        );
        service.run_auto_advance(&session, ticket).await;
    }
    println!();
    print_session(&*session.lock().await);
    Ok(())
}

async fn run_my_courses(
    args: Args,
    api: Arc<dyn CourseApi>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = EnrollmentCatalog::fetch(api.as_ref()).await?;
    if catalog.is_empty() {
        println!("You are not enrolled in any courses yet.");
        return Ok(());
    }

    let term = args.search.unwrap_or_default();
    let entries = catalog.filter_by_title(&term);
    if entries.is_empty() {
        println!("No enrolled course matches {term:?}.");
        return Ok(());
    }

    for entry in entries {
        let status = if entry.progress.is_complete() {
            "completed"
        } else if entry.is_started() {
            "in progress"
        } else {
            "not started"
        };
        println!(
            "{:<40} {:>5}  {status:<11} <{}>",
            entry.course.title(),
            entry.progress.to_string(),
            entry.course.id()
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingArgument { name: "command" }.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    log::debug!("using backend {:?}", parsed.api);
    let api: Arc<dyn CourseApi> = Arc::new(HttpCourseApi::new(parsed.api.clone())?);

    match cmd {
        Command::MyCourses => run_my_courses(parsed, api).await,
        _ => run_session_command(cmd, parsed, api).await,
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
