pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[clap(name = "caixa", about = "Offline-first treasury ledger")]
#[clap(version, author)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[clap(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record an inflow
    #[clap(name = "in")]
    In {
        /// Inflow kind (tithe-offering, communion, construction, ...)
        kind: String,
        /// Amount received
        amount: Decimal,
        /// What the money is
        description: String,
        /// Date the transaction represents (YYYY-MM-DD, defaults to today)
        #[clap(long)]
        date: Option<NaiveDate>,
    },

    /// Record an outflow
    #[clap(name = "out")]
    Out {
        /// Free-form expense category
        category: String,
        /// Amount spent
        amount: Decimal,
        /// What the money paid for
        description: String,
        /// Date the transaction represents (YYYY-MM-DD, defaults to today)
        #[clap(long)]
        date: Option<NaiveDate>,
    },

    /// List records (both collections when none is given)
    #[clap(name = "ls")]
    Ls {
        /// Collection to list: entradas or saidas
        collection: Option<String>,
    },

    /// Delete a record from a collection
    #[clap(name = "rm")]
    Rm {
        /// Collection the record lives in: entradas or saidas
        collection: String,
        /// Record id
        id: Uuid,
    },

    /// Show the four allocation fund totals
    #[clap(name = "dashboard")]
    Dashboard,

    /// Probe the remote endpoint and replay queued writes
    #[clap(name = "sync")]
    Sync,

    /// Fetch remote records that are missing locally
    #[clap(name = "pull")]
    Pull,

    /// Show connectivity, pending queue depth and session
    #[clap(name = "status")]
    Status,

    /// Remote endpoint commands
    #[clap(subcommand, name = "remote")]
    Remote(RemoteCommands),

    /// User management commands
    #[clap(subcommand, name = "user")]
    User(UserCommands),

    /// Log in (prompts for the password)
    #[clap(name = "login")]
    Login {
        /// User id
        user: String,
    },

    /// Log out of the current session
    #[clap(name = "logout")]
    Logout,

    /// Export both collections to a JSON backup file
    #[clap(name = "export")]
    Export {
        /// Output path (defaults to caixa-backup-<date>.json)
        path: Option<PathBuf>,
    },

    /// Delete every record after confirmation
    #[clap(name = "clear")]
    Clear,
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Configure the Apps Script endpoint and spreadsheet id
    #[clap(name = "set")]
    Set {
        /// Apps Script endpoint URL
        script_url: String,
        /// Spreadsheet identifier
        sheets_id: String,
    },

    /// Probe the configured endpoint
    #[clap(name = "test")]
    Test,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add or update a user (prompts for a password)
    #[clap(name = "add")]
    Add {
        /// User id used for login
        id: String,
        /// Display name stamped into records
        name: String,
        /// Role shown in listings
        #[clap(long, default_value = "member")]
        role: String,
    },
}
