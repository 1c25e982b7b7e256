pub mod init;
pub mod login;
pub mod logout;
pub mod reset;
pub mod stats;
pub mod sync;
pub mod watch;

use crate::api::ScreenTimeClient;
use crate::libs::{clock::SystemClock, config::Config, engine::Tracker, notify::ConsoleNotifier, persistence::PersistenceLayer};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init(init::InitArgs),
    #[command(about = "Store the access and refresh tokens issued by the web app")]
    Login(login::LoginArgs),
    #[command(about = "Drop credentials, counters and the offline queue")]
    Logout,
    #[command(about = "Show today's dwell time per website")]
    Stats(stats::StatsArgs),
    #[command(about = "Push unsynced days and pull today's record")]
    Sync,
    #[command(about = "Queue today's counters and start the day from zero")]
    Reset,
    #[command(about = "Run as the browser's native messaging host")]
    Watch,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> Result<()> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args),
            Commands::Login(args) => login::cmd(args).await,
            Commands::Logout => logout::cmd().await,
            Commands::Stats(args) => stats::cmd(args).await,
            Commands::Sync => sync::cmd().await,
            Commands::Reset => reset::cmd().await,
            Commands::Watch => watch::cmd().await,
        }
    }
}

/// Engine wired for one-shot commands: signals go to the console.
pub(crate) type LocalTracker = Tracker<ScreenTimeClient, SystemClock, ConsoleNotifier>;

/// Builds an engine over the default store and restores its saved state.
pub(crate) async fn local_tracker() -> Result<LocalTracker> {
    let config = Config::read()?;
    let api = ScreenTimeClient::new(&config.server(), &config.tracker());
    let mut tracker = Tracker::new(api, SystemClock, ConsoleNotifier, PersistenceLayer::open_default()?, &config);
    tracker.restore().await;
    Ok(tracker)
}
