#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{Parser, Subcommand};
use command::{
    AskInput, AskStrategy, CommandStrategy, InitStrategy, PlansStrategy, TelegramInput,
    TelegramStrategy, VersionStrategy,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "dpdrbot")]
#[command(about = "DPDR support assistant bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot
    Telegram {
        /// Bot token (overrides config and BOT_TOKEN)
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Send a single message through the assistant
    Ask {
        /// Message to send
        #[arg(short = 'm', long)]
        message: String,

        /// User id to charge the quota to
        #[arg(short, long, default_value_t = 0)]
        user_id: i64,
    },
    /// Initialize configuration
    Init,
    /// List subscription plans
    Plans,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Telegram { token } => TelegramStrategy.execute(TelegramInput { token }).await,
        Commands::Ask { message, user_id } => {
            AskStrategy.execute(AskInput { message, user_id }).await
        }
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Plans => PlansStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
