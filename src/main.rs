mod api;
mod cli;
mod db;
mod directory;
mod error;
mod fmt;
mod models;
mod money;
mod payments;
mod reconciler;
mod reports;
mod settings;
mod snapshot;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use payments::PaymentDraft;

fn init_tracing(verbose: bool) {
    let default = if verbose { "bursar=debug" } else { "bursar=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init {
            data_dir,
            api_url,
            currency,
            overpayment,
            default_payer,
        } => cli::init::run(data_dir, api_url, currency, overpayment, default_payer),
        Commands::Sync => cli::sync::run(),
        Commands::Import { file } => cli::import::run(&file),
        Commands::Fees {
            payer,
            name,
            overpayment,
        } => cli::fees::run(payer.as_deref(), name.as_deref(), overpayment),
        Commands::Pending { overpayment } => cli::pending::run(overpayment),
        Commands::Dashboard { year } => cli::dashboard::run(year),
        Commands::Record {
            payer,
            structure,
            amount,
            method,
            date,
            transaction_id,
            remarks,
            dry_run,
        } => cli::record::run(
            PaymentDraft {
                payer,
                fee_structure: structure,
                amount,
                method,
                date,
                transaction_id,
                remarks,
            },
            dry_run,
        ),
        Commands::Export {
            output,
            payer,
            name,
        } => cli::export::run(&output, payer.as_deref(), name.as_deref()),
        Commands::Status => cli::status::run(),
        Commands::Completions { shell } => cli::completions::run(shell),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
