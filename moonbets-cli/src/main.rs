mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::{CliConfig, ClusterArg};
use moonbets_core::{format_sol, AuthorityError, MoonbetsError, SignerError, ValidationError};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "moonbets")]
#[command(about = "moonbets - dice wagers on Solana")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/moonbets/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use a cluster preset instead of the config file
    #[arg(long, global = true, value_enum)]
    cluster: Option<ClusterArg>,

    /// Solana CLI keypair file (defaults to ~/.config/solana/id.json)
    #[arg(short, long, global = true)]
    keypair: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bet on a dice roll and wait for the result
    Bet {
        /// Number to bet on (1-6)
        number: u8,
        /// Stake in SOL, e.g. 0.05
        amount: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Bet even if the previous bet has not settled
        #[arg(long)]
        force: bool,
    },

    /// Show balance and player stats
    Status,

    /// Create the player account
    Init,

    /// Withdraw pending winnings
    Withdraw,

    /// Show the effective configuration
    Config {
        /// Save it to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "moonbets={},moonbets_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli).await {
        report_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = CliConfig::new(cli.config, cli.keypair);
    let config = paths.client_config(cli.cluster)?;
    let ctx = commands::Context { cli: paths, config };

    match cli.command {
        Commands::Bet {
            number,
            amount,
            json,
            force,
        } => commands::handle_bet(&ctx, number, &amount, json, force).await,
        Commands::Status => commands::handle_status(&ctx).await,
        Commands::Init => commands::handle_init(&ctx).await,
        Commands::Withdraw => commands::handle_withdraw(&ctx).await,
        Commands::Config { write } => commands::handle_config(&ctx, write),
    }
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<MoonbetsError>() {
        Some(MoonbetsError::Validation(ValidationError::InsufficientBalance { need, available })) => {
            eprintln!("Error: Insufficient balance");
            eprintln!(
                "Need: {} SOL, Available: {} SOL",
                format_sol(*need),
                format_sol(*available)
            );
        }
        Some(MoonbetsError::Validation(ValidationError::BetPending(number))) => {
            eprintln!("Error: Your bet on {} is still rolling", number);
            eprintln!("Check 'moonbets status' and try again once it settles, or pass --force");
        }
        Some(MoonbetsError::Validation(e)) => {
            eprintln!("Error: Invalid bet: {}", e);
        }
        Some(MoonbetsError::Authority(AuthorityError::AccountNotFound(player))) => {
            eprintln!("Error: Player account {} not found", player);
            eprintln!("Use 'moonbets init' to create it");
        }
        Some(MoonbetsError::Signer(SignerError::Io(_))) => {
            eprintln!("Error: {:#}", err);
            eprintln!("Pass --keypair <file> to use another keypair");
        }
        Some(MoonbetsError::Config(msg)) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Use 'moonbets config' to see the effective settings");
        }
        _ => {
            eprintln!("Error: {:#}", err);
        }
    }
}
