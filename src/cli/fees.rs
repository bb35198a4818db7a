use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::load_ledger;
use crate::error::Result;
use crate::fmt::money;
use crate::reconciler::{payer_key, reconcile_with, OverpaymentPolicy};
use crate::reports::statement_totals;
use crate::settings::load_settings;

pub fn run(payer: Option<&str>, name: Option<&str>, overpayment: Option<OverpaymentPolicy>) -> Result<()> {
    let settings = load_settings();
    let conn = super::open_cache(&settings)?;
    let ledger = load_ledger(&conn)?;
    let policy = super::policy_or(overpayment, &settings);
    let filter = super::payer_filter(payer, name, &settings);
    let sym = settings.currency_symbol.as_str();

    let rec = reconcile_with(&ledger.fee_structures, &ledger.fee_payments, filter.as_ref(), policy);

    if rec.rows.is_empty() {
        println!("No fee payments found.");
        return Ok(());
    }

    let mut header = vec!["Date", "Fee Type", "Method", "Transaction", "Paid", "Total", "Remaining"];
    if filter.is_none() {
        header.insert(1, "Payer");
    }
    let mut table = Table::new();
    table.set_header(header);
    for row in &rec.rows {
        let p = row.payment;
        let remaining = if row.remaining_amount.is_zero() {
            money(row.remaining_amount, sym).green().to_string()
        } else {
            money(row.remaining_amount, sym).red().to_string()
        };
        let fee_type = if row.is_orphaned() {
            row.fee_type.yellow().to_string()
        } else {
            row.fee_type.clone()
        };
        let mut cells = vec![
            Cell::new(p.payment_date.as_deref().unwrap_or("")),
            Cell::new(fee_type),
            Cell::new(p.payment_method.as_deref().unwrap_or("")),
            Cell::new(p.transaction_id.as_deref().unwrap_or("")),
            Cell::new(money(row.amount_paid, sym)),
            Cell::new(money(row.total_amount, sym)),
            Cell::new(remaining),
        ];
        if filter.is_none() {
            cells.insert(1, Cell::new(payer_key(p)));
        }
        table.add_row(cells);
    }

    let title = match &filter {
        Some(f) => format!(
            "Fees for {}",
            f.identity.as_deref().or(f.name.as_deref()).unwrap_or("")
        ),
        None => "Fees (all payers)".to_string(),
    };
    println!("{title}\n{table}");

    let totals = statement_totals(&rec);
    println!();
    println!("Total due:   {}", money(totals.total_amount, sym));
    println!("Total paid:  {}", money(totals.total_paid, sym));
    println!("Remaining:   {}", money(totals.remaining_amount, sym).bold());
    if !totals.credit.is_zero() {
        println!("Credit:      {}", money(totals.credit, sym).cyan());
    }
    for b in rec.balances.iter().filter(|b| b.flagged) {
        let whom = if filter.is_none() && !b.payer.is_empty() {
            format!(", {}", b.payer)
        } else {
            String::new()
        };
        println!(
            "{} {} (structure {}{whom}) overpaid by {}",
            "OVERPAID".red().bold(),
            b.fee_type,
            b.fee_structure,
            money(b.excess, sym)
        );
    }

    super::print_warnings(&rec.warnings);
    Ok(())
}
