use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::load_ledger;
use crate::error::Result;
use crate::fmt::money;
use crate::money::saturating_sum;
use crate::reconciler::OverpaymentPolicy;
use crate::reports::pending_fees;
use crate::settings::load_settings;

pub fn run(overpayment: Option<OverpaymentPolicy>) -> Result<()> {
    let settings = load_settings();
    let conn = super::open_cache(&settings)?;
    let ledger = load_ledger(&conn)?;
    let sym = settings.currency_symbol.as_str();

    let rows = pending_fees(&ledger, super::policy_or(overpayment, &settings));
    if rows.is_empty() {
        println!("No pending fees.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Student", "Payer", "Class", "Section", "Fee Type", "Year", "Total", "Paid", "Remaining",
    ]);
    for r in &rows {
        table.add_row(vec![
            Cell::new(&r.info.name),
            Cell::new(&r.payer),
            Cell::new(&r.info.class_name),
            Cell::new(&r.info.section),
            Cell::new(&r.fee_type),
            Cell::new(&r.academic_year),
            Cell::new(money(r.total_amount, sym)),
            Cell::new(money(r.total_paid, sym)),
            Cell::new(money(r.remaining_amount, sym).red().to_string()),
        ]);
    }
    let outstanding = saturating_sum(rows.iter().map(|r| r.remaining_amount));
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(outstanding, sym).bold()),
    ]);
    println!("Pending Fees ({})\n{table}", rows.len());
    Ok(())
}
