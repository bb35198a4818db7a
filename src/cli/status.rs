use crate::db::{get_connection, last_syncs, table_count};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:     {}", settings.data_dir);
    println!("Database:     {}", db_path.display());
    println!("Backend:      {}", settings.effective_api_url());
    println!("Overpayment:  {}", settings.overpayment);
    println!(
        "Default payer: {}",
        settings.default_payer.as_deref().unwrap_or("(not set)")
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `bursar init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:      {}", format_bytes(size));

    let conn = get_connection(&db_path)?;
    crate::db::init_db(&conn)?;
    println!();
    for table in ["fee_structures", "fee_payments", "students", "classes"] {
        println!("{:<15} {}", format!("{table}:"), table_count(&conn, table)?);
    }

    let syncs = last_syncs(&conn)?;
    if !syncs.is_empty() {
        println!();
        for s in &syncs {
            println!(
                "Last sync of {:<15} {} ({} records from {})",
                s.table_name, s.synced_at, s.record_count, s.source
            );
        }
    }
    Ok(())
}
