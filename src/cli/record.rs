use colored::Colorize;

use crate::api::Backend;
use crate::db::{insert_payment, load_ledger};
use crate::error::Result;
use crate::fmt::money;
use crate::money::parse_or_zero;
use crate::payments::{validate, PaymentDraft};
use crate::settings::load_settings;

pub fn run(draft: PaymentDraft, dry_run: bool) -> Result<()> {
    let settings = load_settings();
    let mut conn = super::open_cache(&settings)?;
    let ledger = load_ledger(&conn)?;
    let today = chrono::Local::now().date_naive();

    let payment = validate(&draft, &ledger, settings.overpayment, today)?;
    let amount = money(parse_or_zero(Some(&payment.amount_paid)), &settings.currency_symbol);

    if dry_run {
        println!(
            "Valid: {} from {} for structure {} ({}, {})",
            amount, payment.student, payment.fee_structure, payment.payment_method, payment.payment_date
        );
        return Ok(());
    }

    let backend = Backend::new(&settings.effective_api_url())?;
    let stored = backend.create_payment(&payment)?;
    insert_payment(&mut conn, &stored)?;

    println!(
        "{} {} from {} ({})",
        "Recorded".green().bold(),
        amount,
        payment.student,
        stored
            .transaction_id
            .as_deref()
            .unwrap_or(&payment.transaction_id)
    );
    Ok(())
}
