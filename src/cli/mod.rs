pub mod completions;
pub mod dashboard;
pub mod export;
pub mod fees;
pub mod import;
pub mod init;
pub mod pending;
pub mod record;
pub mod status;
pub mod sync;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{BursarError, Result};
use crate::reconciler::{OverpaymentPolicy, PayerFilter, ReconcileWarning};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "bursar", about = "Fee ledger reconciliation for school finance offices.")]
pub struct Cli {
    /// Log progress to stderr (same as RUST_LOG=bursar=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings and create the local cache.
    Init {
        /// Path for bursar data (default: ~/Documents/bursar)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Backend base URL, e.g. https://school.example/api
        #[arg(long = "api-url")]
        api_url: Option<String>,
        /// Currency symbol used in tables
        #[arg(long)]
        currency: Option<String>,
        /// Overpayment policy: ignore, flag, credit
        #[arg(long)]
        overpayment: Option<OverpaymentPolicy>,
        /// Payer used when --payer is omitted
        #[arg(long = "default-payer")]
        default_payer: Option<String>,
    },
    /// Fetch fee structures, payments, students and classes from the backend.
    Sync,
    /// Load an offline JSON snapshot into the cache.
    Import {
        /// Path to a snapshot file with fee_structures, fee_payments, students, classes
        file: String,
    },
    /// Show one payer's reconciled fee payments.
    Fees {
        /// Payer identity (email)
        #[arg(long)]
        payer: Option<String>,
        /// Payer display name, matched when a payment has no identity
        #[arg(long)]
        name: Option<String>,
        /// Override the configured overpayment policy
        #[arg(long)]
        overpayment: Option<OverpaymentPolicy>,
    },
    /// List every payer with an outstanding balance.
    Pending {
        /// Override the configured overpayment policy
        #[arg(long)]
        overpayment: Option<OverpaymentPolicy>,
    },
    /// Whole-school finance summary and monthly trend.
    Dashboard {
        /// Restrict the monthly trend to one year
        #[arg(long)]
        year: Option<i32>,
    },
    /// Validate and post a new fee payment.
    Record {
        /// Payer identity (email)
        #[arg(long)]
        payer: String,
        /// Fee structure id
        #[arg(long)]
        structure: i64,
        /// Amount paid
        #[arg(long)]
        amount: String,
        /// Cash, Card, Bank Transfer, Online or Cheque
        #[arg(long)]
        method: String,
        /// Payment date YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Transaction reference (generated when omitted)
        #[arg(long = "transaction-id")]
        transaction_id: Option<String>,
        #[arg(long)]
        remarks: Option<String>,
        /// Validate only; do not post
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Write reconciled payment rows to CSV.
    Export {
        /// Output file path
        #[arg(long)]
        output: String,
        /// Scope to one payer (all payers when omitted)
        #[arg(long)]
        payer: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show settings, cache location and row counts.
    Status,
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Open the cache, failing if `bursar init` has not been run.
pub(crate) fn open_cache(settings: &Settings) -> Result<Connection> {
    let path = settings.db_path();
    if !path.exists() {
        return Err(BursarError::NotInitialized);
    }
    let conn = get_connection(&path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// Build a payer filter from flags, falling back to the configured default.
pub(crate) fn payer_filter(
    payer: Option<&str>,
    name: Option<&str>,
    settings: &Settings,
) -> Option<PayerFilter> {
    let identity = payer.or(settings.default_payer.as_deref());
    let filter = match (identity, name) {
        (Some(id), Some(n)) => PayerFilter::identity(id).with_name(n),
        (Some(id), None) => PayerFilter::identity(id),
        (None, Some(n)) => PayerFilter::default().with_name(n),
        (None, None) => return None,
    };
    Some(filter)
}

pub(crate) fn policy_or(override_policy: Option<OverpaymentPolicy>, settings: &Settings) -> OverpaymentPolicy {
    override_policy.unwrap_or(settings.overpayment)
}

pub(crate) fn print_warnings(warnings: &[ReconcileWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("\n{} ({})", "Data warnings".yellow().bold(), warnings.len());
    for w in warnings {
        println!("  {} {w}", "!".yellow());
    }
}
