mod commands;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use commands::{Args, Command};
use ledger_engine::{JsonFileStore, Ledger, LoadWarning, PasswordPolicy, Token};

type CliLedger = Ledger<JsonFileStore>;

fn main() -> Result<()> {
    // Parse the CLI arguments
    let args = Args::parse();

    // Initialize logger with default level of warn (can be overridden with RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // 1. Open the ledger file
    log::info!("Using ledger file {}", args.store.display());
    let ledger = Ledger::open_with_policy(
        JsonFileStore::new(&args.store),
        PasswordPolicy {
            min_length: args.min_password_length,
        },
    );

    match ledger.load_warning() {
        None | Some(LoadWarning::Missing) => {}
        Some(warning) => eprintln!("Warning: {warning}"),
    }

    // 2. Run the requested command
    run(&ledger, &args)
}

fn run(ledger: &CliLedger, args: &Args) -> Result<()> {
    match &args.command {
        Command::Create { id } => {
            ledger
                .create_account(id, password(args)?)
                .with_context(|| format!("Failed to create account {id}"))?;
            println!("Account created successfully for {id}!");
        }
        Command::Login { id } => {
            let token = login(ledger, args, id)?;
            println!("Login successful! Welcome, {}.", token.account_id());
        }
        Command::Deposit { id, amount } => {
            login(ledger, args, id)?;
            let balance = ledger
                .deposit(id, *amount)
                .context("Failed to deposit")?;
            println!("Successfully deposited ${amount}. Current balance: ${balance}");
        }
        Command::Withdraw { id, amount } => {
            login(ledger, args, id)?;
            let balance = ledger
                .withdraw(id, *amount)
                .context("Failed to withdraw")?;
            println!("Successfully withdrew ${amount}. Current balance: ${balance}");
        }
        Command::Balance { id } => {
            login(ledger, args, id)?;
            let balance = ledger.balance(id).context("Failed to read balance")?;
            println!("Current balance: ${balance}");
        }
        Command::Transfer { id, to, amount } => {
            login(ledger, args, id)?;
            let balance = ledger
                .transfer(id, to, *amount)
                .context("Failed to transfer")?;
            println!(
                "Successfully transferred ${amount} to {to}. Current balance: ${balance}"
            );
        }
        Command::Export => {
            ledger
                .export_balances(std::io::stdout())
                .context("Failed to export balances to stdout")?;
        }
    }
    Ok(())
}

fn password(args: &Args) -> Result<&str> {
    args.password
        .as_deref()
        .ok_or_else(|| anyhow!("A password is required (use --password or LEDGER_PASSWORD)"))
}

fn login(ledger: &CliLedger, args: &Args, id: &str) -> Result<Token> {
    ledger
        .authenticate(id, password(args)?)
        .context("Failed to log in")
}
