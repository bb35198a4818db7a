use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::directory::{Directory, PayerInfo};
use crate::models::{FeePayment, Snapshot};
use crate::money::{round2, saturating_sum};
use crate::reconciler::{payer_key, reconcile_with, OverpaymentPolicy, ReconciledRow, Reconciliation};

// ---------------------------------------------------------------------------
// Finance dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub month: String,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinanceSummary {
    pub total_paid: Decimal,
    pub total_pending: Decimal,
    pub transport_income: Decimal,
    pub monthly_trend: Vec<MonthBucket>,
    pub payment_count: usize,
    /// Payments left out of the trend because their date did not parse.
    pub undated: usize,
    pub warnings: usize,
}

/// Whole-school rollups. `year` restricts the monthly trend only.
pub fn finance_summary(ledger: &Snapshot, policy: OverpaymentPolicy, year: Option<i32>) -> FinanceSummary {
    let rec = reconcile_with(&ledger.fee_structures, &ledger.fee_payments, None, policy);

    let total_paid = saturating_sum(
        rec.rows
            .iter()
            .filter(|r| r.payment.is_paid())
            .map(|r| r.amount_paid),
    );

    let transport_income = saturating_sum(
        rec.rows
            .iter()
            .filter(|r| r.fee_type.eq_ignore_ascii_case("transport"))
            .map(|r| r.amount_paid),
    );

    let mut months: BTreeMap<String, MonthBucket> = BTreeMap::new();
    let mut undated = 0;
    for row in &rec.rows {
        let Some(date) = payment_date(row.payment) else {
            tracing::warn!(payment = ?row.payment.id, "payment date unreadable, left out of trend");
            undated += 1;
            continue;
        };
        if year.is_some_and(|y| y != date.year()) {
            continue;
        }
        let key = format!("{:04}-{:02}", date.year(), date.month());
        let bucket = months.entry(key.clone()).or_insert_with(|| MonthBucket {
            month: key,
            total: Decimal::ZERO,
            count: 0,
        });
        bucket.total = bucket.total.saturating_add(row.amount_paid);
        bucket.count += 1;
    }

    FinanceSummary {
        total_paid: round2(total_paid),
        total_pending: round2(rec.total_pending()),
        transport_income: round2(transport_income),
        monthly_trend: months.into_values().collect(),
        payment_count: rec.rows.len(),
        undated,
        warnings: rec.warnings.len(),
    }
}

/// Accepts `YYYY-MM-DD` with or without a trailing time part.
pub fn payment_date(payment: &FeePayment) -> Option<NaiveDate> {
    let raw = payment.payment_date.as_deref()?.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Pending fees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PendingFee {
    pub payer: String,
    pub info: PayerInfo,
    pub fee_structure: i64,
    pub fee_type: String,
    pub academic_year: String,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
}

/// Every (payer, structure) pair that still owes money, largest balance first.
/// Built from the same balances as the dashboard's `total_pending`.
pub fn pending_fees(ledger: &Snapshot, policy: OverpaymentPolicy) -> Vec<PendingFee> {
    let directory = Directory::new(&ledger.students, &ledger.classes);
    let rec = reconcile_with(&ledger.fee_structures, &ledger.fee_payments, None, policy);

    let mut first_rows: HashMap<(i64, String), &ReconciledRow<'_>> = HashMap::new();
    for row in &rec.rows {
        if let Some(id) = row.structure.and_then(|s| s.id) {
            first_rows.entry((id, payer_key(row.payment))).or_insert(row);
        }
    }

    let mut pending = Vec::new();
    for balance in rec.balances.iter().filter(|b| b.remaining_amount > Decimal::ZERO) {
        let Some(row) = first_rows.get(&(balance.fee_structure, balance.payer.clone())) else {
            continue;
        };
        pending.push(PendingFee {
            payer: balance.payer.clone(),
            info: directory.resolve(row.payment),
            fee_structure: balance.fee_structure,
            fee_type: balance.fee_type.clone(),
            academic_year: row
                .structure
                .and_then(|s| s.academic_year.clone())
                .unwrap_or_default(),
            total_amount: balance.total_amount,
            total_paid: balance.total_paid,
            remaining_amount: balance.remaining_amount,
        });
    }

    pending.sort_by(|a, b| {
        b.remaining_amount
            .cmp(&a.remaining_amount)
            .then_with(|| a.info.name.cmp(&b.info.name))
            .then_with(|| a.fee_structure.cmp(&b.fee_structure))
    });
    pending
}

// ---------------------------------------------------------------------------
// Payer statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementTotals {
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    pub credit: Decimal,
}

/// Totals across the structures in a (usually payer-scoped) reconciliation.
/// Orphaned payments count towards `total_paid` only.
pub fn statement_totals(rec: &Reconciliation<'_>) -> StatementTotals {
    let orphaned = rec.rows.iter().filter(|r| r.is_orphaned()).map(|r| r.amount_paid);
    StatementTotals {
        total_amount: saturating_sum(rec.balances.iter().map(|b| b.total_amount)),
        total_paid: saturating_sum(rec.balances.iter().map(|b| b.total_paid).chain(orphaned)),
        remaining_amount: saturating_sum(rec.balances.iter().map(|b| b.remaining_amount)),
        credit: saturating_sum(rec.balances.iter().map(|b| b.credit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeeStructure, Student};
    use crate::reconciler::{reconcile, PayerFilter};

    fn structure(id: i64, fee_type: &str, amount: &str) -> FeeStructure {
        FeeStructure {
            id: Some(id),
            fee_type: Some(fee_type.into()),
            amount: Some(amount.into()),
            academic_year: Some("2024-25".into()),
            ..Default::default()
        }
    }

    fn payment(payer: &str, fee_structure: i64, amount: &str, date: &str) -> FeePayment {
        FeePayment {
            payer: Some(payer.into()),
            fee_structure: Some(fee_structure),
            amount_paid: Some(amount.into()),
            payment_date: Some(date.into()),
            status: Some("Paid".into()),
            ..Default::default()
        }
    }

    fn ledger() -> Snapshot {
        Snapshot {
            fee_structures: vec![structure(1, "Tuition", "5000"), structure(2, "Transport", "1200")],
            fee_payments: vec![
                payment("a@x.com", 1, "2000", "2024-01-15"),
                payment("a@x.com", 1, "1000", "2024-02-03"),
                payment("b@x.com", 2, "600", "2025-01-20T09:30:00Z"),
                payment("b@x.com", 2, "600", "not a date"),
            ],
            students: vec![Student {
                name: Some("Asha Rao".into()),
                email: Some("a@x.com".into()),
                class_name: Some("7".into()),
                section: Some("B".into()),
                ..Default::default()
            }],
            classes: vec![],
        }
    }

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_finance_summary_totals() {
        let s = finance_summary(&ledger(), OverpaymentPolicy::Ignore, None);
        assert_eq!(s.total_paid, dec(4200));
        assert_eq!(s.transport_income, dec(1200));
        // Tuition still owes 2000; transport is fully paid.
        assert_eq!(s.total_pending, dec(2000));
        assert_eq!(s.payment_count, 4);
        assert_eq!(s.undated, 1);
    }

    #[test]
    fn test_monthly_trend_keeps_years_apart() {
        let mut l = ledger();
        l.fee_payments = vec![
            payment("a@x.com", 1, "100", "2024-01-15"),
            payment("a@x.com", 1, "200", "2025-01-20"),
        ];
        let s = finance_summary(&l, OverpaymentPolicy::Ignore, None);
        let months: Vec<&str> = s.monthly_trend.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2025-01"]);
        assert_eq!(s.monthly_trend[0].total, dec(100));
        assert_eq!(s.monthly_trend[1].total, dec(200));
    }

    #[test]
    fn test_monthly_trend_year_filter() {
        let s = finance_summary(&ledger(), OverpaymentPolicy::Ignore, Some(2024));
        let months: Vec<&str> = s.monthly_trend.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        // Totals are not year-scoped.
        assert_eq!(s.total_paid, dec(4200));
    }

    #[test]
    fn test_unpaid_status_excluded_from_total_paid() {
        let mut l = ledger();
        l.fee_payments[0].status = Some("Pending".into());
        let s = finance_summary(&l, OverpaymentPolicy::Ignore, None);
        assert_eq!(s.total_paid, dec(2200));
    }

    #[test]
    fn test_pending_fees_per_payer() {
        let mut l = ledger();
        l.fee_payments.push(payment("c@x.com", 1, "4500", "2024-03-01"));
        let pending = pending_fees(&l, OverpaymentPolicy::Ignore);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payer, "a@x.com");
        assert_eq!(pending[0].info.name, "Asha Rao");
        assert_eq!(pending[0].remaining_amount, dec(2000));
        assert_eq!(pending[0].academic_year, "2024-25");
        assert_eq!(pending[1].payer, "c@x.com");
        assert_eq!(pending[1].remaining_amount, dec(500));
    }

    #[test]
    fn test_dashboard_pending_matches_pending_view() {
        let l = Snapshot {
            fee_structures: vec![structure(1, "Tuition", "5000"), structure(2, "Transport", "1200")],
            fee_payments: vec![
                payment("a@x.com", 1, "2000", "2024-01-15"),
                payment("b@x.com", 1, "4000", "2024-01-20"),
                payment("b@x.com", 2, "1200", "2024-02-01"),
                payment("c@x.com", 1, "6000", "2024-02-11"),
            ],
            ..Default::default()
        };
        let s = finance_summary(&l, OverpaymentPolicy::Ignore, None);
        let pending = pending_fees(&l, OverpaymentPolicy::Ignore);
        let listed: Decimal = pending.iter().map(|p| p.remaining_amount).sum();
        // c's overpayment must not cancel out a's or b's debt.
        assert_eq!(s.total_pending, dec(4000));
        assert_eq!(s.total_pending, listed);
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_pending_fees_keeps_name_only_payers_separate() {
        let mut named = payment("", 1, "500", "2024-01-01");
        named.payer = None;
        named.payer_name = Some("Asha Rao".into());
        let mut both = payment("a@x.com", 1, "1000", "2024-01-02");
        both.payer_name = Some("Asha Rao".into());
        let l = Snapshot {
            fee_structures: vec![structure(1, "Tuition", "5000")],
            fee_payments: vec![both, named],
            ..Default::default()
        };
        let pending = pending_fees(&l, OverpaymentPolicy::Ignore);
        let paid: Vec<(&str, Decimal)> = pending
            .iter()
            .map(|p| (p.payer.as_str(), p.total_paid))
            .collect();
        assert_eq!(paid, vec![("asha rao", dec(500)), ("a@x.com", dec(1000))]);
    }

    #[test]
    fn test_finance_summary_survives_huge_amounts() {
        let max = "79228162514264337593543950335";
        let l = Snapshot {
            fee_structures: vec![structure(1, "Tuition", "5000"), structure(2, "Transport", "1200")],
            fee_payments: vec![
                payment("a@x.com", 1, max, "2024-01-15"),
                payment("b@x.com", 2, max, "2024-01-16"),
            ],
            ..Default::default()
        };
        let s = finance_summary(&l, OverpaymentPolicy::Ignore, None);
        assert_eq!(s.total_paid, Decimal::MAX);
        assert_eq!(s.monthly_trend[0].total, Decimal::MAX);
        assert_eq!(s.total_pending, Decimal::ZERO);
    }

    #[test]
    fn test_pending_fees_empty_when_all_paid() {
        let l = Snapshot {
            fee_structures: vec![structure(1, "Tuition", "100")],
            fee_payments: vec![payment("a@x.com", 1, "100", "2024-01-01")],
            ..Default::default()
        };
        assert!(pending_fees(&l, OverpaymentPolicy::Ignore).is_empty());
    }

    #[test]
    fn test_statement_totals_include_orphans_in_paid_only() {
        let l = ledger();
        let mut payments = l.fee_payments.clone();
        payments.push(payment("a@x.com", 42, "300", "2024-04-01"));
        let filter = PayerFilter::identity("a@x.com");
        let rec = reconcile(&l.fee_structures, &payments, Some(&filter));
        let t = statement_totals(&rec);
        assert_eq!(t.total_amount, dec(5000));
        assert_eq!(t.total_paid, dec(3300));
        assert_eq!(t.remaining_amount, dec(2000));
    }
}
