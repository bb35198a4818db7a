//! Fee ledger reconciliation.
//!
//! Payments are grouped by the fee structure they reference and by payer, and
//! every payment row is annotated with its group's totals. A balance belongs to
//! one (structure, payer) pair: a payer-scoped run has one group per structure,
//! and an unscoped run never lets one payer's payments settle another's fee.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{FeePayment, FeeStructure};
use crate::money::{clamp_non_negative, parse_decimal, round2, saturating_sum};

/// Fee type shown for payments whose structure cannot be found.
pub const UNKNOWN_FEE_TYPE: &str = "Unknown";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// What to do when payments exceed the structure total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverpaymentPolicy {
    /// Clamp the remaining balance at zero and say nothing.
    #[default]
    Ignore,
    /// Clamp, mark the balance as overpaid and emit a warning.
    Flag,
    /// Clamp and carry the excess as a credit on the balance.
    Credit,
}

impl FromStr for OverpaymentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "flag" => Ok(Self::Flag),
            "credit" => Ok(Self::Credit),
            other => Err(format!(
                "unknown overpayment policy '{other}' (expected ignore, flag or credit)"
            )),
        }
    }
}

impl fmt::Display for OverpaymentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ignore => "ignore",
            Self::Flag => "flag",
            Self::Credit => "credit",
        })
    }
}

/// Restricts reconciliation to one payer.
///
/// A payment that carries an identity is matched on identity only. A payment
/// without one is matched on its display name, against either the filter's
/// name or its identity (older rows stored the email in the name slot).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayerFilter {
    pub identity: Option<String>,
    pub name: Option<String>,
}

impl PayerFilter {
    pub fn identity(identity: &str) -> Self {
        Self {
            identity: normalize(Some(identity)),
            name: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = normalize(Some(name));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_none() && self.name.is_none()
    }

    /// Payer key shared by every payment the filter matches.
    pub fn key(&self) -> String {
        self.identity
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }

    pub fn matches(&self, payment: &FeePayment) -> bool {
        if let Some(have) = normalize(payment.payer.as_deref()) {
            return self.identity.as_ref() == Some(&have);
        }
        let Some(have) = normalize(payment.payer_name.as_deref()) else {
            return false;
        };
        self.name.as_ref() == Some(&have) || self.identity.as_ref() == Some(&have)
    }
}

/// Grouping key for a payment's payer: the normalized identity, else the
/// normalized display name, else empty.
pub fn payer_key(payment: &FeePayment) -> String {
    normalize(payment.payer.as_deref())
        .or_else(|| normalize(payment.payer_name.as_deref()))
        .unwrap_or_default()
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Totals for one (structure, payer) pair. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledBalance {
    pub fee_structure: i64,
    /// Payer key, see [`payer_key`].
    pub payer: String,
    pub fee_type: String,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    pub payment_count: usize,
    /// Amount paid beyond `total_amount`, whatever the policy.
    pub excess: Decimal,
    pub flagged: bool,
    pub credit: Decimal,
}

/// One payment annotated with its group's figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow<'a> {
    pub payment: &'a FeePayment,
    pub structure: Option<&'a FeeStructure>,
    pub fee_type: String,
    pub amount_paid: Decimal,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
}

impl ReconciledRow<'_> {
    pub fn is_orphaned(&self) -> bool {
        self.structure.is_none()
    }
}

/// A data problem that was absorbed instead of raised.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileWarning {
    MissingStructure {
        payment_id: Option<i64>,
        fee_structure: Option<i64>,
    },
    InvalidStructureAmount {
        fee_structure: i64,
        raw: Option<String>,
    },
    InvalidPaymentAmount {
        payment_id: Option<i64>,
        raw: Option<String>,
    },
    DuplicateStructure {
        fee_structure: i64,
    },
    Overpaid {
        fee_structure: i64,
        payer: String,
        excess: Decimal,
    },
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStructure {
                payment_id,
                fee_structure,
            } => write!(
                f,
                "payment {} references unknown fee structure {}",
                show_id(*payment_id),
                show_id(*fee_structure)
            ),
            Self::InvalidStructureAmount { fee_structure, raw } => write!(
                f,
                "fee structure {fee_structure} has invalid amount {}, treated as 0",
                show_raw(raw)
            ),
            Self::InvalidPaymentAmount { payment_id, raw } => write!(
                f,
                "payment {} has invalid amount_paid {}, treated as 0",
                show_id(*payment_id),
                show_raw(raw)
            ),
            Self::DuplicateStructure { fee_structure } => write!(
                f,
                "fee structure {fee_structure} appears more than once, first copy used"
            ),
            Self::Overpaid {
                fee_structure,
                payer,
                excess,
            } => write!(
                f,
                "fee structure {fee_structure} overpaid by {excess:.2} for {}",
                if payer.is_empty() { "(unknown payer)" } else { payer }
            ),
        }
    }
}

fn show_id(id: Option<i64>) -> String {
    id.map(|i| format!("#{i}")).unwrap_or_else(|| "(none)".to_string())
}

fn show_raw(raw: &Option<String>) -> String {
    match raw {
        Some(r) => format!("'{r}'"),
        None => "(missing)".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<'a> {
    /// Scoped payments in input order.
    pub rows: Vec<ReconciledRow<'a>>,
    /// One entry per (structure, payer) pair, ordered by structure id then payer.
    pub balances: Vec<ReconciledBalance>,
    pub warnings: Vec<ReconcileWarning>,
}

impl Reconciliation<'_> {
    /// First balance for a structure. A payer-scoped run has at most one.
    pub fn balance(&self, fee_structure: i64) -> Option<&ReconciledBalance> {
        self.balances.iter().find(|b| b.fee_structure == fee_structure)
    }

    pub fn balance_for(&self, fee_structure: i64, payer: &str) -> Option<&ReconciledBalance> {
        self.balances
            .iter()
            .find(|b| b.fee_structure == fee_structure && b.payer == payer)
    }

    /// Sum of outstanding balances, counted once per (structure, payer) pair.
    pub fn total_pending(&self) -> Decimal {
        saturating_sum(
            self.balances
                .iter()
                .map(|b| b.remaining_amount)
                .filter(|r| *r > Decimal::ZERO),
        )
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Reconcile with the default (`ignore`) overpayment policy.
pub fn reconcile<'a>(
    structures: &'a [FeeStructure],
    payments: &'a [FeePayment],
    filter: Option<&PayerFilter>,
) -> Reconciliation<'a> {
    reconcile_with(structures, payments, filter, OverpaymentPolicy::default())
}

pub fn reconcile_with<'a>(
    structures: &'a [FeeStructure],
    payments: &'a [FeePayment],
    filter: Option<&PayerFilter>,
    policy: OverpaymentPolicy,
) -> Reconciliation<'a> {
    let mut warnings = Vec::new();

    let mut by_id: HashMap<i64, &FeeStructure> = HashMap::new();
    for s in structures {
        let Some(id) = s.id else { continue };
        if by_id.contains_key(&id) {
            warnings.push(ReconcileWarning::DuplicateStructure { fee_structure: id });
        } else {
            by_id.insert(id, s);
        }
    }

    // 1. Scope
    let filter = filter.filter(|f| !f.is_empty());
    let scoped: Vec<&FeePayment> = payments
        .iter()
        .filter(|p| filter.map_or(true, |f| f.matches(p)))
        .collect();
    let scope_key = filter.map(PayerFilter::key);

    // 2. Group (amounts parsed once, in input order)
    let mut amounts: Vec<Decimal> = Vec::with_capacity(scoped.len());
    let mut keys: Vec<String> = Vec::with_capacity(scoped.len());
    let mut groups: BTreeMap<(i64, String), Vec<usize>> = BTreeMap::new();
    for (idx, p) in scoped.iter().enumerate() {
        amounts.push(payment_amount(p, &mut warnings));
        keys.push(scope_key.clone().unwrap_or_else(|| payer_key(p)));
        match p.fee_structure.filter(|id| by_id.contains_key(id)) {
            Some(id) => groups.entry((id, keys[idx].clone())).or_default().push(idx),
            None => warnings.push(ReconcileWarning::MissingStructure {
                payment_id: p.id,
                fee_structure: p.fee_structure,
            }),
        }
    }

    // 3. Aggregate
    let mut structure_totals: HashMap<i64, Decimal> = HashMap::new();
    let mut index: HashMap<(i64, String), usize> = HashMap::with_capacity(groups.len());
    let mut balances = Vec::with_capacity(groups.len());
    for ((id, payer), members) in &groups {
        let structure = by_id[id];
        let total_amount = *structure_totals
            .entry(*id)
            .or_insert_with(|| structure_amount(*id, structure, &mut warnings));

        let mut total_paid = Decimal::ZERO;
        for &i in members {
            match total_paid.checked_add(amounts[i]) {
                Some(sum) => total_paid = sum,
                None => {
                    warnings.push(ReconcileWarning::InvalidPaymentAmount {
                        payment_id: scoped[i].id,
                        raw: scoped[i].amount_paid.clone(),
                    });
                    amounts[i] = Decimal::ZERO;
                }
            }
        }
        let total_paid = round2(total_paid);
        let remaining_amount = clamp_non_negative(round2(total_amount - total_paid));
        let excess = clamp_non_negative(total_paid - total_amount);

        let flagged = policy == OverpaymentPolicy::Flag && excess > Decimal::ZERO;
        if flagged {
            warnings.push(ReconcileWarning::Overpaid {
                fee_structure: *id,
                payer: payer.clone(),
                excess,
            });
        }
        index.insert((*id, payer.clone()), balances.len());
        balances.push(ReconciledBalance {
            fee_structure: *id,
            payer: payer.clone(),
            fee_type: fee_type_of(Some(structure)),
            total_amount,
            total_paid,
            remaining_amount,
            payment_count: members.len(),
            excess,
            flagged,
            credit: if policy == OverpaymentPolicy::Credit {
                excess
            } else {
                Decimal::ZERO
            },
        });
    }

    // 4. Attach
    let rows = scoped
        .iter()
        .zip(amounts.iter().zip(keys))
        .map(|(p, (amount, key))| {
            let structure = p.fee_structure.and_then(|id| by_id.get(&id).copied());
            match structure
                .and_then(|s| s.id)
                .and_then(|id| index.get(&(id, key)))
                .map(|&i| &balances[i])
            {
                Some(b) => ReconciledRow {
                    payment: *p,
                    structure,
                    fee_type: b.fee_type.clone(),
                    amount_paid: *amount,
                    total_amount: b.total_amount,
                    total_paid: b.total_paid,
                    remaining_amount: b.remaining_amount,
                },
                None => ReconciledRow {
                    payment: *p,
                    structure: None,
                    fee_type: UNKNOWN_FEE_TYPE.to_string(),
                    amount_paid: *amount,
                    total_amount: Decimal::ZERO,
                    total_paid: round2(*amount),
                    remaining_amount: Decimal::ZERO,
                },
            }
        })
        .collect::<Vec<_>>();

    for w in &warnings {
        tracing::warn!("{w}");
    }
    tracing::debug!(
        rows = rows.len(),
        balances = balances.len(),
        warnings = warnings.len(),
        "reconciled fee ledger"
    );

    Reconciliation {
        rows,
        balances,
        warnings,
    }
}

/// Resolved fee type label for a structure, `"Unknown"` when absent.
pub fn fee_type_of(structure: Option<&FeeStructure>) -> String {
    structure
        .and_then(|s| s.fee_type.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_FEE_TYPE)
        .to_string()
}

fn payment_amount(p: &FeePayment, warnings: &mut Vec<ReconcileWarning>) -> Decimal {
    match p.amount_paid.as_deref().and_then(parse_decimal) {
        Some(d) if d >= Decimal::ZERO => d,
        _ => {
            warnings.push(ReconcileWarning::InvalidPaymentAmount {
                payment_id: p.id,
                raw: p.amount_paid.clone(),
            });
            Decimal::ZERO
        }
    }
}

fn structure_amount(id: i64, s: &FeeStructure, warnings: &mut Vec<ReconcileWarning>) -> Decimal {
    match s.amount.as_deref().and_then(parse_decimal) {
        Some(d) if d >= Decimal::ZERO => round2(d),
        _ => {
            warnings.push(ReconcileWarning::InvalidStructureAmount {
                fee_structure: id,
                raw: s.amount.clone(),
            });
            Decimal::ZERO
        }
    }
}
