//! Token Ledger CLI Application
//!
//! A command-line host that runs one ledger operation per invocation against
//! a JSON-file world state.

use clap::{Parser, Subcommand};
use token_ledger::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "token-ledger")]
#[command(version = "0.1.0")]
#[command(about = "Fungible token ledger over a key-value world state", long_about = None)]
struct Cli {
    /// Data directory for world-state storage
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the token and credit the initial supply to the admin
    Init {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long)]
        name: String,

        /// Initial supply
        #[arg(long)]
        supply: f64,

        /// Admin identity (the only one allowed to mint)
        #[arg(short, long)]
        admin: String,
    },

    /// Create an empty account
    CreateUser {
        #[arg(short, long)]
        name: String,
    },

    /// Mint new tokens to the admin
    Mint {
        #[arg(short, long)]
        admin: String,

        #[arg(long)]
        amount: f64,
    },

    /// Transfer tokens between accounts
    Transfer {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,

        #[arg(long)]
        amount: f64,
    },

    /// Burn tokens from an account
    Burn {
        #[arg(short, long)]
        user: String,

        #[arg(long)]
        amount: f64,
    },

    /// Approve a spender on an owner's account
    Approve {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        spender: String,

        #[arg(long)]
        amount: f64,
    },

    /// Spend an approved allowance
    TransferFrom {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        spender: String,

        #[arg(short, long)]
        recipient: String,

        #[arg(long)]
        amount: f64,
    },

    /// Show an account balance
    Balance {
        #[arg(short, long)]
        user: String,
    },

    /// Show a full account record
    User {
        #[arg(short, long)]
        user: String,
    },

    /// Show token metadata
    Token,

    /// Invoke a procedure by name with positional arguments
    Invoke {
        /// Procedure name (e.g. TransferTokens)
        function: String,

        /// Positional arguments
        args: Vec<String>,
    },

    /// Check the stored ledger for partially applied operations
    Audit,

    /// Show storage statistics
    Stats,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init {
            symbol,
            name,
            supply,
            admin,
        } => {
            cli::cmd_init(&mut state, &symbol, &name, supply, &admin)?;
        }

        Commands::CreateUser { name } => {
            cli::cmd_create_user(&mut state, &name)?;
        }

        Commands::Mint { admin, amount } => {
            cli::cmd_mint(&mut state, &admin, amount)?;
        }

        Commands::Transfer { from, to, amount } => {
            cli::cmd_transfer(&mut state, &from, &to, amount)?;
        }

        Commands::Burn { user, amount } => {
            cli::cmd_burn(&mut state, &user, amount)?;
        }

        Commands::Approve {
            owner,
            spender,
            amount,
        } => {
            cli::cmd_approve(&mut state, &owner, &spender, amount)?;
        }

        Commands::TransferFrom {
            owner,
            spender,
            recipient,
            amount,
        } => {
            cli::cmd_transfer_from(&mut state, &owner, &spender, &recipient, amount)?;
        }

        Commands::Balance { user } => {
            cli::cmd_balance(&state, &user)?;
        }

        Commands::User { user } => {
            cli::cmd_user(&state, &user)?;
        }

        Commands::Token => {
            cli::cmd_token(&state)?;
        }

        Commands::Invoke { function, args } => {
            cli::cmd_invoke(&mut state, &function, &args)?;
        }

        Commands::Audit => {
            cli::cmd_audit(&state)?;
        }

        Commands::Stats => {
            cli::cmd_stats(&state)?;
        }
    }

    Ok(())
}
