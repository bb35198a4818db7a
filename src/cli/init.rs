use std::path::PathBuf;

use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::Result;
use crate::reconciler::OverpaymentPolicy;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(
    data_dir: Option<String>,
    api_url: Option<String>,
    currency: Option<String>,
    overpayment: Option<OverpaymentPolicy>,
    default_payer: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(url) = api_url {
        settings.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(symbol) = currency {
        settings.currency_symbol = symbol;
    }
    if let Some(policy) = overpayment {
        settings.overpayment = policy;
    }
    if let Some(payer) = default_payer {
        settings.default_payer = Some(payer.trim().to_string()).filter(|p| !p.is_empty());
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("exports"))?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;
    tracing::info!(data_dir = %resolved.display(), "cache initialized");

    println!("Initialized bursar at {}", resolved.display());
    println!("Backend: {}", settings.api_url);
    println!("Overpayment policy: {}", settings.overpayment);
    Ok(())
}
