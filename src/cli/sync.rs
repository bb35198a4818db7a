use rusqlite::Connection;

use crate::api::{decode_pages, Backend, Resource};
use crate::db::{self, CacheUpdate, SyncRecord};
use crate::error::Result;
use crate::settings::load_settings;
use crate::snapshot::checksum;

/// Raw pages of one resource as fetched from the backend.
pub struct Fetched {
    pub resource: Resource,
    pub source: String,
    pub pages: Vec<String>,
}

/// Fetch every resource, then replace the changed tables in one transaction.
/// Nothing is written unless every fetch and decode succeeds.
pub fn run() -> Result<()> {
    let settings = load_settings();
    let mut conn = super::open_cache(&settings)?;
    let backend = Backend::new(&settings.effective_api_url())?;

    let mut fetched = Vec::with_capacity(Resource::ALL.len());
    for resource in Resource::ALL {
        fetched.push(Fetched {
            resource,
            source: backend.url(resource),
            pages: backend.fetch_pages(resource)?,
        });
    }

    let update = stage(&conn, fetched)?;
    for resource in Resource::ALL {
        let table = resource.table();
        if !update.syncs.iter().any(|s| s.table_name == table) {
            println!("{table:<15} unchanged");
        }
    }
    if update.syncs.is_empty() {
        return Ok(());
    }
    db::apply_update(&mut conn, &update)?;
    for s in &update.syncs {
        println!("{:<15} {} records", s.table_name, s.record_count);
    }
    Ok(())
}

/// Decode every changed resource into one cache update. Tables whose
/// checksum matches the last sync are left out.
pub fn stage(conn: &Connection, fetched: Vec<Fetched>) -> Result<CacheUpdate> {
    let mut update = CacheUpdate::default();
    for f in fetched {
        let table = f.resource.table();
        let sum = checksum(f.pages.concat().as_bytes());
        if db::last_checksum(conn, table)?.as_deref() == Some(sum.as_str()) {
            continue;
        }
        let record_count = match f.resource {
            Resource::FeeStructures => {
                let rows = decode_pages(&f.pages)?;
                update.fee_structures.insert(rows).len()
            }
            Resource::FeePayments => {
                let rows = decode_pages(&f.pages)?;
                update.fee_payments.insert(rows).len()
            }
            Resource::Students => {
                let rows = decode_pages(&f.pages)?;
                update.students.insert(rows).len()
            }
            Resource::Classes => {
                let rows = decode_pages(&f.pages)?;
                update.classes.insert(rows).len()
            }
        };
        tracing::debug!(table, pages = f.pages.len(), record_count, "staged");
        update.syncs.push(SyncRecord {
            table_name: table,
            source: f.source,
            checksum: sum,
            record_count,
        });
    }
    Ok(update)
}
