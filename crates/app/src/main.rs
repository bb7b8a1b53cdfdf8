use std::fmt;
use std::io::Write;

use flash_core::model::{CategoryId, Credentials};
use services::{AppServices, Clock, ExitConfirmation, PracticeSession, SessionError, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingCategory,
    InvalidCategory { raw: String },
    InvalidSeed { raw: String },
    MissingCredentials,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingCategory => write!(f, "practice requires --category <id>"),
            ArgsError::InvalidCategory { raw } => write!(f, "invalid --category value: {raw:?}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::MissingCredentials => write!(
                f,
                "no credentials: pass --email/--password or set FLASHENG_EMAIL/FLASHENG_PASSWORD"
            ),
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
    eprintln!("  flasheng categories [--email <email>] [--password <password>]");
    eprintln!(
        "  flasheng practice --category <id> [--seed <n>] [--email <email>] [--password <password>]"
    );
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  FLASHENG_API_URL (default http://localhost:5001/api)");
    eprintln!("  FLASHENG_API_TIMEOUT_SECS (default 30)");
    eprintln!("  FLASHENG_EMAIL, FLASHENG_PASSWORD");
    eprintln!("  RUST_LOG (default flasheng=info,services=info,storage=warn)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Categories,
    Practice,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "categories" => Some(Self::Categories),
            "practice" => Some(Self::Practice),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    category: Option<CategoryId>,
    seed: Option<u64>,
    email: Option<String>,
    password: Option<String>,
}

impl Args {
    fn parse(command: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            email: std::env::var("FLASHENG_EMAIL").ok(),
            password: std::env::var("FLASHENG_PASSWORD").ok(),
            ..Self::default()
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--password" => parsed.password = Some(require_value(args, "--password")?),
                "--category" if command == Command::Practice => {
                    let value = require_value(args, "--category")?;
                    let id = value
                        .parse::<CategoryId>()
                        .map_err(|_| ArgsError::InvalidCategory { raw: value.clone() })?;
                    parsed.category = Some(id);
                }
                "--seed" if command == Command::Practice => {
                    let value = require_value(args, "--seed")?;
                    let seed = value
                        .parse::<u64>()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    parsed.seed = Some(seed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command == Command::Practice && parsed.category.is_none() {
            return Err(ArgsError::MissingCategory);
        }
        Ok(parsed)
    }

    fn credentials(&self) -> Result<Credentials, Box<dyn std::error::Error>> {
        let (Some(email), Some(password)) = (&self.email, &self.password) else {
            return Err(ArgsError::MissingCredentials.into());
        };
        Ok(Credentials::new(email, password.clone())?)
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flasheng=info,services=info,storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let command = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(arg) if arg == "--help" || arg == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(arg) => Command::from_arg(&arg).ok_or_else(|| {
            eprintln!("unknown subcommand: {arg}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(command, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = AppServices::from_env(Clock::default())?;
    let user = services.auth().login(&parsed.credentials()?).await?;
    tracing::info!(user_id = %user.id, "signed in as {}", user.full_name);

    match command {
        Command::Categories => list_categories(&services).await,
        Command::Practice => {
            let category = parsed.category.ok_or(ArgsError::MissingCategory)?;
            practice(&services, &category, parsed.seed).await
        }
    }
}

async fn list_categories(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let categories = services.catalog().refresh_categories().await?;
    if categories.is_empty() {
        println!("No categories yet.");
        return Ok(());
    }
    for category in categories {
        let count = category
            .flashcard_count
            .map_or_else(String::new, |n| format!("  {n} cards"));
        let marker = if category.is_default { "  [default]" } else { "" };
        println!("{}  {}{count}{marker}", category.id, category.name);
    }
    Ok(())
}

async fn practice(
    services: &AppServices,
    category: &CategoryId,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut practice = services.practice().as_ref().clone();
    if let Some(seed) = seed {
        practice = practice.with_seed(seed);
    }

    let mut session = practice.start_session(category).await?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!("Practising {} cards. Type a number or the word, q to quit.", session.total_cards());

    loop {
        match session.state() {
            SessionState::InProgress => {
                print_question(&session);
                let Some(line) = prompt_line(&mut input, "> ").await? else {
                    practice.exit_session(&mut session, ExitConfirmation::Confirmed)?;
                    return Ok(());
                };

                if line.trim().eq_ignore_ascii_case("q") {
                    let confirmation = confirm_exit(&mut input).await?;
                    match practice.exit_session(&mut session, confirmation) {
                        Ok(()) => {
                            println!("Session abandoned. Nothing was saved.");
                            return Ok(());
                        }
                        Err(services::PracticeError::Session(SessionError::ExitNotConfirmed)) => {
                            continue;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }

                let answer = resolve_answer(&line, session.options());
                match session.submit_answer(&answer) {
                    Ok(verdict) if verdict.correct => println!("Correct!"),
                    Ok(verdict) => println!("Wrong, the answer was \"{}\".", verdict.expected),
                    Err(SessionError::InvalidAnswer) => println!("Pick an option first."),
                    Err(err) => return Err(err.into()),
                }
            }
            SessionState::Answered => {
                let outcome = practice.advance(&mut session).await?;
                if let Some(summary) = outcome.summary {
                    println!();
                    println!(
                        "Done: {}/{} correct ({}%) in {}s.",
                        summary.correct_answers(),
                        summary.total_cards(),
                        summary.score_percentage(),
                        summary.duration_secs()
                    );
                    if !outcome.reported {
                        println!("Results could not be saved to the server.");
                    }
                }
            }
            SessionState::Completed | SessionState::Abandoned => return Ok(()),
        }
    }
}

fn print_question(session: &PracticeSession) {
    let progress = session.progress();
    println!();
    println!(
        "[{}/{}] {}",
        progress.question_number(),
        progress.total,
        session.prompt().unwrap_or_default()
    );
    if let Some(hint) = session.current_card().and_then(|card| card.hint()) {
        println!("  hint: {hint}");
    }
    for (n, option) in session.options().iter().enumerate() {
        println!("  {}. {option}", n + 1);
    }
}

/// Map an option number to its text; anything else is taken as typed.
fn resolve_answer(raw: &str, options: &[String]) -> String {
    raw.trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .cloned()
        .unwrap_or_else(|| raw.trim().to_owned())
}

async fn confirm_exit(input: &mut Input) -> std::io::Result<ExitConfirmation> {
    let reply = prompt_line(input, "Quit now? Your progress will be lost. [y/N] ").await?;
    let confirmed = reply.is_some_and(|r| matches!(r.trim(), "y" | "Y" | "yes"));
    Ok(if confirmed {
        ExitConfirmation::Confirmed
    } else {
        ExitConfirmation::Declined
    })
}

async fn prompt_line(input: &mut Input, prompt: &str) -> std::io::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    input.next_line().await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["happy".into(), "sad".into(), "calm".into()]
    }

    #[test]
    fn numbers_pick_options() {
        assert_eq!(resolve_answer(" 2 ", &options()), "sad");
    }

    #[test]
    fn out_of_range_numbers_are_taken_literally() {
        assert_eq!(resolve_answer("0", &options()), "0");
        assert_eq!(resolve_answer("9", &options()), "9");
    }

    #[test]
    fn words_pass_through_trimmed() {
        assert_eq!(resolve_answer("  Calm ", &options()), "Calm");
    }

    #[test]
    fn practice_requires_category() {
        let mut args = Vec::<String>::new().into_iter();
        let err = Args::parse(Command::Practice, &mut args).unwrap_err();
        assert!(matches!(err, ArgsError::MissingCategory));
    }

    #[test]
    fn practice_parses_category_and_seed() {
        let mut args = ["--category", "emotions", "--seed", "42"]
            .map(String::from)
            .into_iter();
        let parsed = Args::parse(Command::Practice, &mut args).unwrap();
        assert_eq!(parsed.category, Some(CategoryId::new("emotions")));
        assert_eq!(parsed.seed, Some(42));
    }

    #[test]
    fn categories_rejects_practice_flags() {
        let mut args = ["--seed", "1"].map(String::from).into_iter();
        let err = Args::parse(Command::Categories, &mut args).unwrap_err();
        assert!(matches!(err, ArgsError::UnknownArg(arg) if arg == "--seed"));
    }
}
