use crate::server;
use clap::{Args, Parser, Subcommand};
use hackathon::config::AppConfig;
use hackathon::error::AppError;
use hackathon::workflows::application::{FileQuestionSource, QuestionSource};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Hackathon Applications",
    about = "Run the hackathon application intake service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the application question configuration
    Questions {
        #[command(subcommand)]
        command: QuestionsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum QuestionsCommand {
    /// Validate the question file and print a per-branch summary
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON file of users to preload into the in-memory store
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct CheckArgs {
    /// Question file to check instead of QUESTIONS_PATH
    #[arg(long)]
    path: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Questions {
            command: QuestionsCommand::Check(args),
        } => check_questions(args).await,
    }
}

async fn check_questions(args: CheckArgs) -> Result<(), AppError> {
    let path = match args.path {
        Some(path) => path,
        None => AppConfig::load()?.event.questions_path,
    };
    let source = FileQuestionSource::new(path);
    let branches = source.load().await?;

    println!("{}: {} branch(es)", source.path().display(), branches.len());
    for branch in branches.iter() {
        let required = branch
            .questions
            .iter()
            .filter(|question| question.required)
            .count();
        println!(
            "  {:<16} {:>3} questions, {:>3} required",
            branch.name,
            branch.questions.len(),
            required
        );
    }
    Ok(())
}
