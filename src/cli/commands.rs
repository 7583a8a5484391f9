pub(crate) use clap::Parser;
use clap::Subcommand;
use ledger_engine::{Cents, DEFAULT_MIN_PASSWORD_LENGTH};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ledger",
    author,
    version,
    about = "A simple banking ledger",
    long_about = None,
    after_help = "CREDENTIALS:\n    Commands acting on an account log in first. Pass the password with\n    --password or the LEDGER_PASSWORD environment variable:\n\n    LEDGER_PASSWORD=secret1 ledger deposit alice 100"
)]
pub struct Args {
    /// Path to the JSON ledger file
    #[arg(
        long,
        global = true,
        env = "LEDGER_STORE",
        value_name = "FILE",
        default_value = "accounts.json"
    )]
    pub store: PathBuf,

    /// Minimum length of new passwords
    #[arg(
        long,
        global = true,
        env = "LEDGER_MIN_PASSWORD_LENGTH",
        default_value_t = DEFAULT_MIN_PASSWORD_LENGTH
    )]
    pub min_password_length: usize,

    /// Account password
    #[arg(long, global = true, env = "LEDGER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account with a zero balance
    Create { id: String },
    /// Check credentials
    Login { id: String },
    /// Deposit money into your account
    Deposit {
        id: String,
        #[arg(value_parser = parse_amount)]
        amount: Cents,
    },
    /// Withdraw money from your account
    Withdraw {
        id: String,
        #[arg(value_parser = parse_amount)]
        amount: Cents,
    },
    /// Show your current balance
    Balance { id: String },
    /// Transfer money to another account
    Transfer {
        id: String,
        /// Recipient account
        to: String,
        #[arg(value_parser = parse_amount)]
        amount: Cents,
    },
    /// Print every balance as CSV to stdout
    Export,
}

fn parse_amount(input: &str) -> Result<Cents, String> {
    Cents::parse(input).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_transfer_with_amount() {
        let args = Args::try_parse_from([
            "ledger",
            "--password",
            "secret1",
            "transfer",
            "alice",
            "bob",
            "40.5",
        ])
        .unwrap();

        assert_eq!(args.password.as_deref(), Some("secret1"));
        match args.command {
            Command::Transfer { id, to, amount } => {
                assert_eq!(id, "alice");
                assert_eq!(to, "bob");
                assert_eq!(amount, Cents::new(4050));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_amount() {
        assert!(Args::try_parse_from(["ledger", "deposit", "alice", "-3"]).is_err());
        assert!(Args::try_parse_from(["ledger", "deposit", "alice", "1.001"]).is_err());
    }

    #[test]
    fn test_parses_store_path() {
        let args = Args::try_parse_from(["ledger", "--store", "bank.json", "export"]).unwrap();
        assert_eq!(args.store, PathBuf::from("bank.json"));
        assert!(matches!(args.command, Command::Export));
    }
}
