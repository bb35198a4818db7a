use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
  "fee_structures": [
    {"id": 1, "class_name": "7", "section": "B", "fee_type": "Tuition", "amount": "5000.00",
     "frequency": "Yearly", "academic_year": "2024-25"},
    {"id": 2, "class_name": "7", "section": "B", "fee_type": "Transport", "amount": 1200,
     "frequency": "Yearly", "academic_year": "2024-25"}
  ],
  "fee_payments": [
    {"id": 1, "student": "a@x.com", "fee_structure": 1, "amount_paid": "2000",
     "payment_date": "2024-01-15", "payment_method": "Cash", "transaction_id": "T1", "status": "Paid"},
    {"id": 2, "student": "b@x.com", "fee_structure": 1, "amount_paid": "4000",
     "payment_date": "2025-01-20", "payment_method": "Online", "transaction_id": "T2", "status": "Paid"},
    {"id": 3, "student": "a@x.com", "fee_structure": 2, "amount_paid": "1200",
     "payment_date": "2024-02-01", "payment_method": "Card", "transaction_id": "T3", "status": "Paid"},
    {"id": 4, "student": "a@x.com", "fee_structure": 99, "amount_paid": "50",
     "payment_date": "2024-03-01", "payment_method": "Cash", "transaction_id": "T4", "status": "Paid"}
  ],
  "students": [
    {"id": 1, "name": "Asha Rao", "email": "a@x.com", "class_name": "7", "section": "B"},
    {"id": 2, "name": "Ben Ito", "email": "b@x.com", "student_class": 3}
  ],
  "classes": [
    {"id": 3, "class_name": "8", "section": "A"}
  ]
}"#;

fn bursar(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bursar").unwrap();
    cmd.env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("BURSAR_API_URL");
    cmd
}

/// Initialized home with the snapshot imported.
fn setup() -> TempDir {
    let home = tempfile::tempdir().unwrap();
    let data_dir = home.path().join("data");
    bursar(home.path())
        .args(["init", "--currency", "$", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized bursar"));

    let snap = home.path().join("snapshot.json");
    std::fs::write(&snap, SNAPSHOT).unwrap();
    bursar(home.path())
        .arg("import")
        .arg(&snap)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 fee structures, 4 payments"));
    home
}

#[test]
fn test_commands_fail_before_init() {
    let home = tempfile::tempdir().unwrap();
    bursar(home.path())
        .arg("fees")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bursar init"));
}

#[test]
fn test_fees_are_scoped_to_payer() {
    let home = setup();
    bursar(home.path())
        .args(["fees", "--payer", "A@X.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fees for a@x.com"))
        .stdout(predicate::str::contains("$3,000.00"))
        .stdout(predicate::str::contains("Unknown"))
        .stdout(predicate::str::contains("T2").not())
        .stdout(predicate::str::contains("references unknown fee structure #99"));
}

#[test]
fn test_pending_lists_outstanding_payers() {
    let home = setup();
    bursar(home.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("Asha Rao"))
        .stdout(predicate::str::contains("Ben Ito"))
        .stdout(predicate::str::contains("$1,000.00"))
        .stdout(predicate::str::contains("$4,000.00"));
}

#[test]
fn test_dashboard_buckets_by_year_and_month() {
    let home = setup();
    bursar(home.path())
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("Jan 2024"))
        .stdout(predicate::str::contains("Jan 2025"))
        .stdout(predicate::str::contains("$7,250.00"))
        .stdout(predicate::str::contains("$1,200.00"))
        .stdout(predicate::str::is_match(r"Total pending[^\n]*\$4,000\.00").unwrap());
}

#[test]
fn test_unscoped_fees_keep_payers_apart() {
    let home = setup();
    bursar(home.path())
        .arg("fees")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fees (all payers)"))
        .stdout(predicate::str::is_match(r"b@x\.com[^\n]*\$4,000\.00[^\n]*\$5,000\.00[^\n]*\$1,000\.00").unwrap())
        .stdout(predicate::str::is_match(r"a@x\.com[^\n]*\$2,000\.00[^\n]*\$5,000\.00[^\n]*\$3,000\.00").unwrap());
}

#[test]
fn test_record_dry_run_validates_cumulative_amount() {
    let home = setup();
    bursar(home.path())
        .args([
            "record", "--payer", "a@x.com", "--structure", "1", "--amount", "3000",
            "--method", "cheque", "--date", "2024-05-01", "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid: $3,000.00 from a@x.com"));

    bursar(home.path())
        .args([
            "record", "--payer", "a@x.com", "--structure", "1", "--amount", "3500",
            "--method", "Cash", "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds remaining balance"));
}

#[test]
fn test_export_writes_csv() {
    let home = setup();
    let out = home.path().join("fees.csv");
    bursar(home.path())
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 4 rows"));

    let csv = std::fs::read_to_string(&out).unwrap();
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.contains("Ben Ito,8,A,1,Tuition"));
    // Each payer's row carries that payer's own balance.
    assert!(csv.contains("2000.00,5000.00,2000.00,3000.00"));
    assert!(csv.contains("4000.00,5000.00,4000.00,1000.00"));
}

#[test]
fn test_status_reports_counts() {
    let home = setup();
    bursar(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("fee_payments:"))
        .stdout(predicate::str::contains("snapshot.json"));
}

#[test]
fn test_reimporting_same_snapshot_is_skipped() {
    let home = setup();
    bursar(home.path())
        .arg("import")
        .arg(home.path().join("snapshot.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("already been imported"));
}
