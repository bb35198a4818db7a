use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::db::load_ledger;
use crate::directory::Directory;
use crate::error::Result;
use crate::fmt::plain;
use crate::reconciler::{reconcile, Reconciliation};
use crate::settings::{load_settings, shellexpand_path};

#[derive(Serialize)]
struct ExportRow<'a> {
    payment_id: Option<i64>,
    payer: &'a str,
    student: String,
    class_name: String,
    section: String,
    fee_structure: Option<i64>,
    fee_type: &'a str,
    payment_date: &'a str,
    payment_method: &'a str,
    transaction_id: &'a str,
    status: &'a str,
    amount_paid: String,
    total_amount: String,
    total_paid: String,
    remaining_amount: String,
}

pub fn run(output: &str, payer: Option<&str>, name: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let conn = super::open_cache(&settings)?;
    let ledger = load_ledger(&conn)?;
    let filter = super::payer_filter(payer, name, &settings);

    // Row figures do not depend on the overpayment policy.
    let rec = reconcile(&ledger.fee_structures, &ledger.fee_payments, filter.as_ref());
    let directory = Directory::new(&ledger.students, &ledger.classes);

    let path = PathBuf::from(shellexpand_path(output));
    let file = std::fs::File::create(&path)?;
    let count = write_csv(file, &rec, &directory)?;

    println!("Exported {count} rows to {}", path.display());
    Ok(())
}

pub fn write_csv<W: Write>(writer: W, rec: &Reconciliation<'_>, directory: &Directory<'_>) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in &rec.rows {
        let p = row.payment;
        let info = directory.resolve(p);
        wtr.serialize(ExportRow {
            payment_id: p.id,
            payer: p.payer.as_deref().unwrap_or(""),
            student: info.name,
            class_name: info.class_name,
            section: info.section,
            fee_structure: p.fee_structure,
            fee_type: &row.fee_type,
            payment_date: p.payment_date.as_deref().unwrap_or(""),
            payment_method: p.payment_method.as_deref().unwrap_or(""),
            transaction_id: p.transaction_id.as_deref().unwrap_or(""),
            status: p.status.as_deref().unwrap_or("Paid"),
            amount_paid: plain(row.amount_paid),
            total_amount: plain(row.total_amount),
            total_paid: plain(row.total_paid),
            remaining_amount: plain(row.remaining_amount),
        })?;
    }
    wtr.flush()?;
    Ok(rec.rows.len())
}
