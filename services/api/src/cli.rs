use crate::commands::{run_classify, run_sync, run_validate, ClassifyArgs, SyncArgs, ValidateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use focus_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Focus Engine",
    about = "Serve, inspect, and sync coaching program focus areas from the command line",
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
    /// Classify a score on the fixed display scale and, optionally, against thresholds
    Classify(ClassifyArgs),
    /// Check evaluation thresholds and print the legal slider ranges
    Validate(ValidateArgs),
    /// Reconcile a program with the portal and print its focus area tree
    Sync(SyncArgs),
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
        Command::Classify(args) => run_classify(args),
        Command::Validate(args) => run_validate(args),
        Command::Sync(args) => run_sync(args).await,
    }
}
