use std::path::PathBuf;

use crate::db::{self, CacheUpdate};
use crate::error::Result;
use crate::settings::load_settings;
use crate::snapshot::read_snapshot;

pub fn run(file: &str) -> Result<()> {
    let settings = load_settings();
    let mut conn = super::open_cache(&settings)?;
    let path = PathBuf::from(file);

    let (snap, sum) = read_snapshot(&path)?;
    if db::last_checksum(&conn, "fee_payments")?.as_deref() == Some(sum.as_str()) {
        println!("This snapshot has already been imported (duplicate checksum).");
        return Ok(());
    }

    let summary = format!(
        "Imported {} fee structures, {} payments, {} students, {} classes",
        snap.fee_structures.len(),
        snap.fee_payments.len(),
        snap.students.len(),
        snap.classes.len()
    );
    let source = path.display().to_string();
    db::apply_update(&mut conn, &CacheUpdate::from_snapshot(snap, &source, &sum))?;

    println!("{summary}");
    Ok(())
}
