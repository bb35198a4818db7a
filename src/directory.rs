//! Payer lookup for display. Never consulted for balance math.

use std::collections::HashMap;

use crate::models::{FeePayment, SchoolClass, Student};

const PLACEHOLDER: &str = "\u{2014}";

/// Display details for one payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayerInfo {
    pub name: String,
    pub class_name: String,
    pub section: String,
}

pub struct Directory<'a> {
    by_email: HashMap<String, &'a Student>,
    by_name: HashMap<String, &'a Student>,
    classes: HashMap<i64, &'a SchoolClass>,
}

impl<'a> Directory<'a> {
    pub fn new(students: &'a [Student], classes: &'a [SchoolClass]) -> Self {
        let mut by_email = HashMap::new();
        let mut by_name = HashMap::new();
        for s in students {
            if let Some(email) = key(s.email.as_deref()) {
                by_email.entry(email).or_insert(s);
            }
            if let Some(name) = key(s.name.as_deref()) {
                by_name.entry(name).or_insert(s);
            }
        }
        let classes = classes
            .iter()
            .filter_map(|c| c.id.map(|id| (id, c)))
            .collect();
        Self {
            by_email,
            by_name,
            classes,
        }
    }

    /// Find the student behind a payment: email first, then display name.
    pub fn student_for(&self, payment: &FeePayment) -> Option<&'a Student> {
        key(payment.payer.as_deref())
            .and_then(|k| self.by_email.get(&k).copied())
            .or_else(|| {
                key(payment.payer_name.as_deref())
                    .or_else(|| key(payment.payer.as_deref()))
                    .and_then(|k| self.by_name.get(&k).copied())
            })
    }

    /// Resolve name, class and section. Class details come from the student
    /// row when present, otherwise from the linked class record.
    pub fn resolve(&self, payment: &FeePayment) -> PayerInfo {
        let student = self.student_for(payment);
        let class = student
            .and_then(|s| s.class_id)
            .and_then(|id| self.classes.get(&id).copied());

        let name = student
            .and_then(|s| s.name.clone())
            .or_else(|| payment.payer_name.clone())
            .or_else(|| payment.payer.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let class_name = student
            .and_then(|s| s.class_name.clone())
            .or_else(|| class.and_then(|c| c.class_name.clone()))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let section = student
            .and_then(|s| s.section.clone())
            .or_else(|| class.and_then(|c| c.section.clone()))
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        PayerInfo {
            name,
            class_name,
            section,
        }
    }
}

fn key(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}
