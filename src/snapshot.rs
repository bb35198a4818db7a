use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{BursarError, Result};
use crate::models::Snapshot;

pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Read an offline snapshot: `{fee_structures, fee_payments, students, classes}`.
/// Returns the parsed tables and the file checksum.
pub fn read_snapshot(path: &Path) -> Result<(Snapshot, String)> {
    let data = std::fs::read(path)?;
    let snap: Snapshot = serde_json::from_slice(&data).map_err(|e| {
        BursarError::Other(format!("{} is not a valid snapshot: {e}", path.display()))
    })?;
    Ok((snap, checksum(&data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable_sha256() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_read_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(
            &path,
            r#"{"fee_structures": [{"id": 1, "amount": "5000"}],
                "fee_payments": [{"student": "a@x.com", "fee_structure": 1, "amount_paid": 2000}]}"#,
        )
        .unwrap();
        let (snap, sum) = read_snapshot(&path).unwrap();
        assert_eq!(snap.fee_structures.len(), 1);
        assert_eq!(snap.fee_payments[0].payer.as_deref(), Some("a@x.com"));
        assert!(snap.students.is_empty());
        assert_eq!(sum.len(), 64);
    }

    #[test]
    fn test_read_snapshot_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let err = read_snapshot(&path).unwrap_err();
        assert!(err.to_string().contains("not a valid snapshot"));
    }
}
