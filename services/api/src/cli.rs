use crate::commands::{run_audit, run_match, run_requirements, AuditArgs, MatchArgs, RequirementsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use subsidy_navigator::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Subsidy Navigator",
    about = "Match small businesses to subsidy programs and track application documents",
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
    /// Score questionnaire answers against every subsidy program
    Match(MatchArgs),
    /// List the documents required for a program, frame and conditions
    Requirements(RequirementsArgs),
    /// Probe a deployed API for common web vulnerabilities
    Audit(AuditArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Match(args) => run_match(args),
        Command::Requirements(args) => run_requirements(args),
        Command::Audit(args) => run_audit(args).await,
    }
}
