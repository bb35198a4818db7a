//! Checks a new payment before it is posted to the backend.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::error::{BursarError, Result};
use crate::models::{NewPayment, PaymentMethod, Snapshot};
use crate::money::{parse_decimal, round2};
use crate::reconciler::{reconcile_with, OverpaymentPolicy, PayerFilter};

/// Unvalidated input from the `record` command.
#[derive(Debug, Clone, Default)]
pub struct PaymentDraft {
    pub payer: String,
    pub fee_structure: i64,
    pub amount: String,
    pub method: String,
    pub date: Option<String>,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
}

pub fn validate(
    draft: &PaymentDraft,
    ledger: &Snapshot,
    policy: OverpaymentPolicy,
    today: NaiveDate,
) -> Result<NewPayment> {
    let payer = draft.payer.trim();
    if payer.is_empty() {
        return Err(BursarError::Validation("payer is required".into()));
    }

    let amount = parse_decimal(&draft.amount)
        .ok_or_else(|| BursarError::Validation(format!("amount '{}' is not a number", draft.amount)))?;
    if amount <= Decimal::ZERO {
        return Err(BursarError::Validation("amount must be greater than zero".into()));
    }
    let amount = round2(amount);

    let method: PaymentMethod = draft.method.parse().map_err(BursarError::Validation)?;

    let date = match draft.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| BursarError::Validation(format!("date '{raw}' is not YYYY-MM-DD")))?,
        _ => today,
    };

    let structure = ledger
        .fee_structures
        .iter()
        .find(|s| s.id == Some(draft.fee_structure))
        .ok_or(BursarError::UnknownStructure(draft.fee_structure))?;

    // Cumulative check against what this payer already paid, including rows
    // stored under the student's display name only.
    let mut filter = PayerFilter::identity(payer);
    if let Some(name) = ledger
        .students
        .iter()
        .find(|s| s.email.as_deref().is_some_and(|e| e.trim().eq_ignore_ascii_case(payer)))
        .and_then(|s| s.name.as_deref())
    {
        filter = filter.with_name(name);
    }
    let rec = reconcile_with(
        std::slice::from_ref(structure),
        &ledger.fee_payments,
        Some(&filter),
        policy,
    );
    let remaining = match rec.balance_for(draft.fee_structure, &filter.key()) {
        Some(b) => b.remaining_amount,
        None => structure
            .amount
            .as_deref()
            .and_then(parse_decimal)
            .filter(|d| *d > Decimal::ZERO)
            .map(round2)
            .unwrap_or(Decimal::ZERO),
    };
    if amount > remaining && policy != OverpaymentPolicy::Credit {
        return Err(BursarError::Validation(format!(
            "amount {amount:.2} exceeds remaining balance {remaining:.2} for fee structure {}",
            draft.fee_structure
        )));
    }

    let date = date.format("%Y-%m-%d").to_string();
    let transaction_id = match draft.transaction_id.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => transaction_id(payer, draft.fee_structure, amount, &date, rec.rows.len()),
    };

    Ok(NewPayment {
        student: payer.to_string(),
        fee_structure: draft.fee_structure,
        amount_paid: format!("{amount:.2}"),
        payment_date: date,
        payment_method: method.label().to_string(),
        transaction_id,
        status: "Paid".to_string(),
        remarks: draft.remarks.clone().unwrap_or_default(),
    })
}

/// Deterministic reference for payments entered without one.
fn transaction_id(payer: &str, fee_structure: i64, amount: Decimal, date: &str, seq: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{fee_structure}|{amount:.2}|{date}|{seq}", payer.to_lowercase()));
    let digest = hex::encode(hasher.finalize());
    format!("TXN-{}", digest[..12].to_uppercase())
}
