use std::path::Path;

use rusqlite::{params, Connection, Transaction};

use crate::error::Result;
use crate::models::{FeePayment, FeeStructure, SchoolClass, Snapshot, Student};

pub const DB_FILE: &str = "bursar.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS fee_structures (
    seq INTEGER PRIMARY KEY,
    id INTEGER,
    class_name TEXT,
    section TEXT,
    fee_type TEXT,
    amount TEXT,
    frequency TEXT,
    academic_year TEXT
);

CREATE TABLE IF NOT EXISTS fee_payments (
    seq INTEGER PRIMARY KEY,
    id INTEGER,
    payer TEXT,
    payer_name TEXT,
    fee_structure INTEGER,
    amount_paid TEXT,
    payment_date TEXT,
    payment_method TEXT,
    transaction_id TEXT,
    status TEXT,
    remarks TEXT
);

CREATE TABLE IF NOT EXISTS students (
    seq INTEGER PRIMARY KEY,
    id INTEGER,
    name TEXT,
    email TEXT,
    class_name TEXT,
    section TEXT,
    class_id INTEGER
);

CREATE TABLE IF NOT EXISTS classes (
    seq INTEGER PRIMARY KEY,
    id INTEGER,
    class_name TEXT,
    section TEXT
);

CREATE TABLE IF NOT EXISTS sync_log (
    id INTEGER PRIMARY KEY,
    table_name TEXT NOT NULL,
    source TEXT NOT NULL,
    checksum TEXT NOT NULL,
    record_count INTEGER NOT NULL,
    synced_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Tables to replace together, with the sync_log rows that describe them.
/// A `None` table is left as it is.
#[derive(Debug, Default)]
pub struct CacheUpdate {
    pub fee_structures: Option<Vec<FeeStructure>>,
    pub fee_payments: Option<Vec<FeePayment>>,
    pub students: Option<Vec<Student>>,
    pub classes: Option<Vec<SchoolClass>>,
    pub syncs: Vec<SyncRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    pub table_name: &'static str,
    pub source: String,
    pub checksum: String,
    pub record_count: usize,
}

impl CacheUpdate {
    /// Every table from a snapshot file, all logged under one checksum.
    pub fn from_snapshot(snap: Snapshot, source: &str, checksum: &str) -> Self {
        let counts = [
            ("fee_structures", snap.fee_structures.len()),
            ("fee_payments", snap.fee_payments.len()),
            ("students", snap.students.len()),
            ("classes", snap.classes.len()),
        ];
        Self {
            fee_structures: Some(snap.fee_structures),
            fee_payments: Some(snap.fee_payments),
            students: Some(snap.students),
            classes: Some(snap.classes),
            syncs: counts
                .into_iter()
                .map(|(table_name, record_count)| SyncRecord {
                    table_name,
                    source: source.to_string(),
                    checksum: checksum.to_string(),
                    record_count,
                })
                .collect(),
        }
    }
}

/// Apply an update in a single transaction: either every listed table is
/// replaced and logged, or nothing changes.
pub fn apply_update(conn: &mut Connection, update: &CacheUpdate) -> Result<()> {
    let tx = conn.transaction()?;
    if let Some(rows) = &update.fee_structures {
        write_structures(&tx, rows)?;
    }
    if let Some(rows) = &update.fee_payments {
        tx.execute("DELETE FROM fee_payments", [])?;
        for p in rows {
            insert_payment_tx(&tx, p)?;
        }
    }
    if let Some(rows) = &update.students {
        write_students(&tx, rows)?;
    }
    if let Some(rows) = &update.classes {
        write_classes(&tx, rows)?;
    }
    for s in &update.syncs {
        record_sync(&tx, s.table_name, &s.source, &s.checksum, s.record_count)?;
    }
    tx.commit()?;
    tracing::debug!(tables = update.syncs.len(), "cache updated");
    Ok(())
}

fn write_structures(tx: &Transaction<'_>, rows: &[FeeStructure]) -> Result<()> {
    tx.execute("DELETE FROM fee_structures", [])?;
    let mut stmt = tx.prepare(
        "INSERT INTO fee_structures (id, class_name, section, fee_type, amount, frequency, academic_year) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for s in rows {
        stmt.execute(params![
            s.id,
            s.class_name,
            s.section,
            s.fee_type,
            s.amount,
            s.frequency,
            s.academic_year
        ])?;
    }
    Ok(())
}

/// Append one payment. The ledger is append-only; nothing here updates rows.
pub fn insert_payment(conn: &mut Connection, p: &FeePayment) -> Result<()> {
    let tx = conn.transaction()?;
    insert_payment_tx(&tx, p)?;
    tx.commit()?;
    Ok(())
}

fn insert_payment_tx(tx: &Transaction<'_>, p: &FeePayment) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO fee_payments (id, payer, payer_name, fee_structure, amount_paid, payment_date, \
         payment_method, transaction_id, status, remarks) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    stmt.execute(params![
        p.id,
        p.payer,
        p.payer_name,
        p.fee_structure,
        p.amount_paid,
        p.payment_date,
        p.payment_method,
        p.transaction_id,
        p.status,
        p.remarks
    ])?;
    Ok(())
}

fn write_students(tx: &Transaction<'_>, rows: &[Student]) -> Result<()> {
    tx.execute("DELETE FROM students", [])?;
    let mut stmt = tx.prepare(
        "INSERT INTO students (id, name, email, class_name, section, class_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for s in rows {
        stmt.execute(params![s.id, s.name, s.email, s.class_name, s.section, s.class_id])?;
    }
    Ok(())
}

fn write_classes(tx: &Transaction<'_>, rows: &[SchoolClass]) -> Result<()> {
    tx.execute("DELETE FROM classes", [])?;
    let mut stmt = tx.prepare("INSERT INTO classes (id, class_name, section) VALUES (?1, ?2, ?3)")?;
    for c in rows {
        stmt.execute(params![c.id, c.class_name, c.section])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub fn load_ledger(conn: &Connection) -> Result<Snapshot> {
    let fee_structures = conn
        .prepare(
            "SELECT id, class_name, section, fee_type, amount, frequency, academic_year \
             FROM fee_structures ORDER BY seq",
        )?
        .query_map([], |row| {
            Ok(FeeStructure {
                id: row.get(0)?,
                class_name: row.get(1)?,
                section: row.get(2)?,
                fee_type: row.get(3)?,
                amount: row.get(4)?,
                frequency: row.get(5)?,
                academic_year: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let fee_payments = conn
        .prepare(
            "SELECT id, payer, payer_name, fee_structure, amount_paid, payment_date, payment_method, \
             transaction_id, status, remarks FROM fee_payments ORDER BY seq",
        )?
        .query_map([], |row| {
            Ok(FeePayment {
                id: row.get(0)?,
                payer: row.get(1)?,
                payer_name: row.get(2)?,
                fee_structure: row.get(3)?,
                amount_paid: row.get(4)?,
                payment_date: row.get(5)?,
                payment_method: row.get(6)?,
                transaction_id: row.get(7)?,
                status: row.get(8)?,
                remarks: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let students = conn
        .prepare("SELECT id, name, email, class_name, section, class_id FROM students ORDER BY seq")?
        .query_map([], |row| {
            Ok(Student {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                class_name: row.get(3)?,
                section: row.get(4)?,
                class_id: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let classes = conn
        .prepare("SELECT id, class_name, section FROM classes ORDER BY seq")?
        .query_map([], |row| {
            Ok(SchoolClass {
                id: row.get(0)?,
                class_name: row.get(1)?,
                section: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        fee_structures,
        fee_payments,
        students,
        classes,
    })
}

pub fn table_count(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT count(*) FROM {table}");
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

// ---------------------------------------------------------------------------
// Sync log
// ---------------------------------------------------------------------------

pub struct SyncEntry {
    pub table_name: String,
    pub source: String,
    pub record_count: i64,
    pub synced_at: String,
}

fn record_sync(
    conn: &Connection,
    table_name: &str,
    source: &str,
    checksum: &str,
    record_count: usize,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_log (table_name, source, checksum, record_count) VALUES (?1, ?2, ?3, ?4)",
        params![table_name, source, checksum, record_count as i64],
    )?;
    Ok(())
}

pub fn last_checksum(conn: &Connection, table_name: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT checksum FROM sync_log WHERE table_name = ?1 ORDER BY id DESC LIMIT 1",
    )?;
    let mut rows = stmt.query([table_name])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

/// Most recent sync per table.
pub fn last_syncs(conn: &Connection) -> Result<Vec<SyncEntry>> {
    let mut stmt = conn.prepare(
        "SELECT table_name, source, record_count, synced_at FROM sync_log \
         WHERE id IN (SELECT max(id) FROM sync_log GROUP BY table_name) \
         ORDER BY table_name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SyncEntry {
                table_name: row.get(0)?,
                source: row.get(1)?,
                record_count: row.get(2)?,
                synced_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
