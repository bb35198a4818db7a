use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// A fee template: what one class/section owes for one fee type in a year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeStructure {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fee_type: Option<String>,
    /// Raw amount as sent by the backend; parsed during reconciliation.
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub academic_year: Option<String>,
}

/// One payment event against a fee structure. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeePayment {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    /// Payer identity, usually an email. Older endpoints call it `student`.
    #[serde(default, alias = "student", deserialize_with = "lenient_string")]
    pub payer: Option<String>,
    #[serde(default, alias = "student_name", deserialize_with = "lenient_string")]
    pub payer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub fee_structure: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_paid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub payment_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub remarks: Option<String>,
}

impl FeePayment {
    /// Payments carry no status other than Paid by construction; a missing
    /// status is read as Paid.
    pub fn is_paid(&self) -> bool {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(s) => s.eq_ignore_ascii_case("paid"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default, alias = "full_name", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: Option<String>,
    #[serde(default, alias = "student_class", deserialize_with = "lenient_id")]
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default, alias = "name", deserialize_with = "lenient_string")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: Option<String>,
}

/// Body of `POST /fee_payments/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPayment {
    pub student: String,
    pub fee_structure: i64,
    pub amount_paid: String,
    pub payment_date: String,
    pub payment_method: String,
    pub transaction_id: String,
    pub status: String,
    pub remarks: String,
}

impl From<&NewPayment> for FeePayment {
    fn from(p: &NewPayment) -> Self {
        FeePayment {
            id: None,
            payer: Some(p.student.clone()),
            payer_name: None,
            fee_structure: Some(p.fee_structure),
            amount_paid: Some(p.amount_paid.clone()),
            payment_date: Some(p.payment_date.clone()),
            payment_method: Some(p.payment_method.clone()),
            transaction_id: Some(p.transaction_id.clone()),
            status: Some(p.status.clone()),
            remarks: Some(p.remarks.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Online,
    Cheque,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        Self::Cash,
        Self::Card,
        Self::BankTransfer,
        Self::Online,
        Self::Cheque,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Card => "Card",
            Self::BankTransfer => "Bank Transfer",
            Self::Online => "Online",
            Self::Cheque => "Cheque",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    /// Accepts the display labels plus `bank_transfer` / `bank-transfer` / `check`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "banktransfer" => Ok(Self::BankTransfer),
            "online" => Ok(Self::Online),
            "cheque" | "check" => Ok(Self::Cheque),
            _ => Err(format!(
                "unknown payment method '{s}' (expected one of: {})",
                Self::ALL.map(|m| m.label()).join(", ")
            )),
        }
    }
}

/// Offline copy of the four backend tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub fee_structures: Vec<FeeStructure>,
    #[serde(default)]
    pub fee_payments: Vec<FeePayment>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub classes: Vec<SchoolClass>,
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Strings, numbers and booleans all become `Some(String)`; null and blank
/// strings become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Integer ids sent either as numbers or numeric strings. Nested objects
/// with an `id` field (expanded foreign keys) are unwrapped.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

fn id_from_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Object(map) => map.get("id").and_then(id_from_value),
        _ => None,
    }
}
