use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "focusmint-cli", version, about = "Focusmint CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Focus session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Step telemetry
    Steps {
        #[command(subcommand)]
        action: commands::steps::StepsAction,
    },
    /// Wallet queries and spending
    Wallet {
        #[command(subcommand)]
        action: commands::wallet::WalletAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Steps { action } => commands::steps::run(action),
        Commands::Wallet { action } => commands::wallet::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
