use crate::reports::{run_dl_eligible_report, run_expiry_report, DlEligibleArgs, ExpiryReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rto_compliance::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "RTO Compliance",
    about = "Serve and report on RTO document and license compliance",
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
    /// Print compliance reports from a snapshot directory
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Vehicle documents expiring inside a date window
    Expiries(ExpiryReportArgs),
    /// Learners past the holding period, from both license sources
    DlEligible(DlEligibleArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Directory of CSV table exports to load at startup
    #[arg(long)]
    pub(crate) snapshot_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report {
            command: ReportCommand::Expiries(args),
        } => run_expiry_report(args),
        Command::Report {
            command: ReportCommand::DlEligible(args),
        } => run_dl_eligible_report(args),
    }
}
