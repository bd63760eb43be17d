use crate::render::{run_catalog_list, run_scorecard_report, CatalogListArgs, ScorecardReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use site_scorecard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Site Scorecard",
    about = "Compute clinical-trial site KPI scorecards and serve them over HTTP",
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
    /// Compute scorecards from exported site data
    Scorecard {
        #[command(subcommand)]
        command: ScorecardCommand,
    },
    /// Inspect the KPI catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ScorecardCommand {
    /// Compute a scorecard from a JSON snapshot and optional weekly CSV
    Report(ScorecardReportArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List KPI definitions grouped by category
    List(CatalogListArgs),
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
        Command::Scorecard {
            command: ScorecardCommand::Report(args),
        } => run_scorecard_report(args),
        Command::Catalog {
            command: CatalogCommand::List(args),
        } => run_catalog_list(args),
    }
}
