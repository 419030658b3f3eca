use crate::demo::{run_demo, run_level_report, DemoArgs, LevelArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use wishlist_rewards::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Wishlist Rewards",
    about = "Run and demonstrate the wishlist badge and points engine",
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
    /// Walk a sample user through wishlists, gifts and follows
    Demo(DemoArgs),
    /// Print level standing and progress for a points balance
    Level(LevelArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Badge catalog CSV to seed instead of the standard catalog
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Level(args) => run_level_report(args),
    }
}
