use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::db::load_ledger;
use crate::error::Result;
use crate::fmt::{money, month_label};
use crate::reports::finance_summary;
use crate::settings::load_settings;

const BAR_WIDTH: i64 = 30;

pub fn run(year: Option<i32>) -> Result<()> {
    let settings = load_settings();
    let conn = super::open_cache(&settings)?;
    let ledger = load_ledger(&conn)?;
    let sym = settings.currency_symbol.as_str();

    let s = finance_summary(&ledger, settings.overpayment, year);

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Amount"]);
    table.add_row(vec![
        Cell::new("Total collected".green().bold()),
        Cell::new(money(s.total_paid, sym)),
    ]);
    table.add_row(vec![
        Cell::new("Total pending".red().bold()),
        Cell::new(money(s.total_pending, sym)),
    ]);
    table.add_row(vec![
        Cell::new("Transport income"),
        Cell::new(money(s.transport_income, sym)),
    ]);
    table.add_row(vec![Cell::new("Payments"), Cell::new(s.payment_count)]);
    println!("Finance Overview\n{table}");

    if !s.monthly_trend.is_empty() {
        let peak = s
            .monthly_trend
            .iter()
            .map(|m| m.total)
            .max()
            .unwrap_or(Decimal::ZERO);
        let mut trend = Table::new();
        trend.set_header(vec!["Month", "Collected", "Count", ""]);
        for m in &s.monthly_trend {
            trend.add_row(vec![
                Cell::new(month_label(&m.month)),
                Cell::new(money(m.total, sym)),
                Cell::new(m.count),
                Cell::new(bar(m.total, peak)),
            ]);
        }
        println!("\nMonthly Collections\n{trend}");
    }

    if s.undated > 0 {
        println!(
            "\n{} {} payment(s) have no readable date and are left out of the trend.",
            "!".yellow(),
            s.undated
        );
    }
    if s.warnings > 0 {
        println!(
            "{} {} data warning(s); run with --verbose for details.",
            "!".yellow(),
            s.warnings
        );
    }
    Ok(())
}

fn bar(value: Decimal, peak: Decimal) -> String {
    if peak <= Decimal::ZERO || value <= Decimal::ZERO {
        return String::new();
    }
    let width = i64::try_from((value / peak * Decimal::from(BAR_WIDTH)).round())
        .unwrap_or(0)
        .max(1);
    "\u{2588}".repeat(width as usize)
}
